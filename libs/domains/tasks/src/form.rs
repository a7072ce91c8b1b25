//! Request bodies for create and update, accepted as multipart, URL-encoded
//! form or JSON.

use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{HeaderMap, header, request::Parts},
};
use axum_helpers::AppError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::str::FromStr;
use strum::VariantNames;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::{TaskError, TaskResult};
use crate::models::{CreateTask, TaskCategory, TaskPriority, TaskStatus, UpdateTask};
use crate::query::{exact_variant, invalid_date, invalid_variant};
use crate::storage::UploadedImage;

/// Parse an ISO-8601 date or date-time.
///
/// Accepts RFC 3339 (`2024-03-01T09:30:00Z`, `2024-03-01T09:30:00+02:00`),
/// a date-time without offset (read as UTC), or a bare date (midnight UTC).
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    exact_variant::<TaskStatus>(value)
        .map(|_| ())
        .ok_or_else(invalid_variant::<TaskStatus>)
}

fn validate_priority(value: &str) -> Result<(), ValidationError> {
    exact_variant::<TaskPriority>(value)
        .map(|_| ())
        .ok_or_else(invalid_variant::<TaskPriority>)
}

fn validate_category(value: &str) -> Result<(), ValidationError> {
    exact_variant::<TaskCategory>(value)
        .map(|_| ())
        .ok_or_else(invalid_variant::<TaskCategory>)
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    parse_iso8601(value).map(|_| ()).ok_or_else(invalid_date)
}

/// Fields for a new task. Every value arrives as text.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskForm {
    #[validate(
        required(message = "title is required"),
        length(min = 5, max = 50, message = "title must be between 5 and 50 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "description is required"),
        length(min = 5, max = 255, message = "description must be between 5 and 255 characters")
    )]
    pub description: Option<String>,
    /// ISO-8601 date
    #[serde(rename = "startDate")]
    #[validate(required(message = "startDate is required"), custom(function = "validate_date"))]
    pub start_date: Option<String>,
    /// ISO-8601 date
    #[serde(rename = "dueDate")]
    #[validate(required(message = "dueDate is required"), custom(function = "validate_date"))]
    pub due_date: Option<String>,
    /// `To Do` (default), `In Progress` or `Done`
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    /// `High`, `Medium` (default) or `Low`
    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,
    /// `Work` (default), `Personal` or `Errands`
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
}

/// Partial update. Only the fields present are validated and changed.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskForm {
    #[validate(length(min = 5, max = 50, message = "title must be between 5 and 50 characters"))]
    pub title: Option<String>,
    #[validate(length(
        min = 5,
        max = 255,
        message = "description must be between 5 and 255 characters"
    ))]
    pub description: Option<String>,
    #[serde(rename = "startDate")]
    #[validate(custom(function = "validate_date"))]
    pub start_date: Option<String>,
    #[serde(rename = "dueDate")]
    #[validate(custom(function = "validate_date"))]
    pub due_date: Option<String>,
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
}

fn parse_variant<E>(field: &str, raw: Option<String>) -> TaskResult<Option<E>>
where
    E: FromStr + VariantNames,
{
    raw.map(|value| {
        exact_variant::<E>(&value)
            .ok_or_else(|| TaskError::InvalidInput(format!("Invalid {}: {}", field, value)))
    })
    .transpose()
}

fn parse_date(field: &str, raw: Option<String>) -> TaskResult<Option<DateTime<Utc>>> {
    raw.map(|value| {
        parse_iso8601(&value)
            .ok_or_else(|| TaskError::InvalidInput(format!("Invalid {}: {}", field, value)))
    })
    .transpose()
}

impl CreateTaskForm {
    /// Convert an already validated form.
    pub fn into_create(self, image: Option<String>) -> TaskResult<CreateTask> {
        Ok(CreateTask {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            start_date: parse_date("startDate", self.start_date)?,
            due_date: parse_date("dueDate", self.due_date)?,
            status: parse_variant("status", self.status)?.unwrap_or_default(),
            priority: parse_variant("priority", self.priority)?.unwrap_or_default(),
            category: parse_variant("category", self.category)?.unwrap_or_default(),
            image,
        })
    }
}

impl UpdateTaskForm {
    /// Convert an already validated form.
    pub fn into_update(self, image: Option<String>) -> TaskResult<UpdateTask> {
        Ok(UpdateTask {
            title: self.title,
            description: self.description,
            start_date: parse_date("startDate", self.start_date)?,
            due_date: parse_date("dueDate", self.due_date)?,
            status: parse_variant("status", self.status)?,
            priority: parse_variant("priority", self.priority)?,
            category: parse_variant("category", self.category)?,
            image,
        })
    }
}

/// A form body plus an optional uploaded image.
///
/// `multipart/form-data` bodies map text parts onto `T` and take the file
/// part named `image`. `application/x-www-form-urlencoded` bodies are read as
/// a plain form, and any other content type as JSON. Unknown parts are
/// ignored and a repeated multipart part keeps its last value.
#[derive(Debug)]
pub struct TaskUpload<T> {
    pub form: T,
    pub image: Option<UploadedImage>,
}

impl<S, T> FromRequest<S> for TaskUpload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<T>::from_request(req, state).await?;
            return Ok(Self { form, image: None });
        }

        if !content_type.starts_with("multipart/form-data") {
            let Json(form) = Json::<T>::from_request(req, state).await?;
            return Ok(Self { form, image: None });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut fields = Map::new();
        let mut image = None;

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == "image" {
                if let Some(file_name) = field.file_name().map(str::to_owned) {
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await?;
                    image = (!bytes.is_empty()).then(|| UploadedImage {
                        file_name,
                        content_type,
                        bytes,
                    });
                    continue;
                }
            }

            let text = field.text().await?;
            fields.insert(name, Value::String(text));
        }

        let form = serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::BadRequest(format!("Invalid form: {}", e)))?;

        Ok(Self { form, image })
    }
}

/// `<proto>://<host>` of the incoming request, used to build image URLs.
///
/// The `Host` header always gives the direct origin. `X-Forwarded-Proto` and
/// `X-Forwarded-Host` are kept apart and only used when the service is
/// configured to trust a fronting proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicBaseUrl {
    direct: String,
    forwarded: Option<String>,
}

impl PublicBaseUrl {
    /// A fixed origin with no forwarded alternative.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            direct: base.into(),
            forwarded: None,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let first = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let host = first(header::HOST.as_str()).unwrap_or("localhost");
        let forwarded_proto = first("x-forwarded-proto");
        let forwarded_host = first("x-forwarded-host");

        let forwarded = (forwarded_proto.is_some() || forwarded_host.is_some()).then(|| {
            format!(
                "{}://{}",
                forwarded_proto.unwrap_or("http"),
                forwarded_host.unwrap_or(host)
            )
        });

        Self {
            direct: format!("http://{}", host),
            forwarded,
        }
    }

    /// The origin to publish, preferring forwarded headers only when trusted.
    pub fn resolve(&self, trust_forwarded: bool) -> &str {
        match &self.forwarded {
            Some(forwarded) if trust_forwarded => forwarded.as_str(),
            _ => self.direct.as_str(),
        }
    }
}

impl<S> FromRequestParts<S> for PublicBaseUrl
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
