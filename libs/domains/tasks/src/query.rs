//! Query-string parameters, pagination, and the store-agnostic search criteria.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::borrow::Cow;
use std::str::FromStr;
use strum::{AsRefStr, EnumString, VariantNames};
use utoipa::IntoParams;
use validator::{ValidationError, ValidationErrors};

use crate::error::{TaskError, TaskResult};
use crate::form::parse_iso8601;
use crate::models::{TaskCategory, TaskPriority, TaskStatus};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Lenient parse: absent, non-numeric or zero values fall back to the
    /// defaults, and `page_size` is capped at `max_page_size`.
    pub fn parse(page: Option<&str>, page_size: Option<&str>, max_page_size: u64) -> Self {
        let positive = |raw: Option<&str>| {
            raw.and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n >= 1)
        };

        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: positive(page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(max_page_size.max(1)),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// `?page=&pageSize=`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Items per page (default 10)
    pub page_size: Option<String>,
}

impl PageQuery {
    pub fn pagination(&self, max_page_size: u64) -> Pagination {
        Pagination::parse(self.page.as_deref(), self.page_size.as_deref(), max_page_size)
    }
}

/// `?keyword=&page=&pageSize=`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Matched case-insensitively against title and description
    pub keyword: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl SearchQuery {
    pub fn pagination(&self, max_page_size: u64) -> Pagination {
        Pagination::parse(self.page.as_deref(), self.page_size.as_deref(), max_page_size)
    }

    pub fn criteria(&self) -> TaskResult<TaskCriteria> {
        let keyword = self
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                let mut errors = ValidationErrors::new();
                errors.add(
                    "keyword",
                    ValidationError::new("required").with_message(Cow::from("keyword is required")),
                );
                TaskError::Validation(errors)
            })?;

        Ok(TaskCriteria {
            keyword: Some(keyword.to_string()),
            ..Default::default()
        })
    }
}

/// Fields a filtered listing may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, VariantNames)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
    Title,
    Description,
    Status,
    Priority,
    Category,
    StartDate,
    DueDate,
    CompletionFlag,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Only the exact string `desc` sorts descending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub order: SortOrder,
}

/// `?status=&priority=&category=&startDate=&dueDate=&sortBy=&sortOrder=&page=&pageSize=`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// `To Do`, `In Progress` or `Done`
    pub status: Option<String>,
    /// `High`, `Medium` or `Low`
    pub priority: Option<String>,
    /// `Work`, `Personal` or `Errands`
    pub category: Option<String>,
    /// Tasks starting on or after this ISO-8601 date
    pub start_date: Option<String>,
    /// Tasks due on or before this ISO-8601 date
    pub due_date: Option<String>,
    /// Field name to sort by
    pub sort_by: Option<String>,
    /// `desc` for descending, anything else ascending
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl FilterQuery {
    pub fn pagination(&self, max_page_size: u64) -> Pagination {
        Pagination::parse(self.page.as_deref(), self.page_size.as_deref(), max_page_size)
    }

    /// Validate every supplied parameter, reporting all failures together.
    pub fn criteria(&self) -> TaskResult<TaskCriteria> {
        let mut errors = ValidationErrors::new();
        let mut criteria = TaskCriteria::default();

        if let Some(raw) = present(&self.status) {
            match exact_variant::<TaskStatus>(raw) {
                Some(status) => criteria.status = Some(status),
                None => errors.add("status", invalid_variant::<TaskStatus>()),
            }
        }
        if let Some(raw) = present(&self.priority) {
            match exact_variant::<TaskPriority>(raw) {
                Some(priority) => criteria.priority = Some(priority),
                None => errors.add("priority", invalid_variant::<TaskPriority>()),
            }
        }
        if let Some(raw) = present(&self.category) {
            match exact_variant::<TaskCategory>(raw) {
                Some(category) => criteria.category = Some(category),
                None => errors.add("category", invalid_variant::<TaskCategory>()),
            }
        }
        if let Some(raw) = present(&self.start_date) {
            match parse_iso8601(raw) {
                Some(date) => criteria.start_from = Some(date),
                None => errors.add("startDate", invalid_date()),
            }
        }
        if let Some(raw) = present(&self.due_date) {
            match parse_iso8601(raw) {
                Some(date) => criteria.due_until = Some(date),
                None => errors.add("dueDate", invalid_date()),
            }
        }
        if let Some(raw) = present(&self.sort_by) {
            match SortField::from_str(raw) {
                Ok(field) => {
                    criteria.sort = Some(TaskSort {
                        field,
                        order: SortOrder::parse(self.sort_order.as_deref()),
                    })
                }
                Err(_) => errors.add(
                    "sortBy",
                    ValidationError::new("invalid_sort_field").with_message(Cow::from(format!(
                        "sortBy must be one of: {}",
                        SortField::VARIANTS.join(", ")
                    ))),
                ),
            }
        }

        if errors.is_empty() {
            Ok(criteria)
        } else {
            Err(TaskError::Validation(errors))
        }
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Case-sensitive membership check followed by the typed parse.
pub(crate) fn exact_variant<E>(raw: &str) -> Option<E>
where
    E: FromStr + VariantNames,
{
    if E::VARIANTS.iter().any(|variant| *variant == raw) {
        E::from_str(raw).ok()
    } else {
        None
    }
}

pub(crate) fn invalid_variant<E: VariantNames>() -> ValidationError {
    ValidationError::new("invalid_choice").with_message(Cow::from(format!(
        "must be one of: {}",
        E::VARIANTS.join(", ")
    )))
}

pub(crate) fn invalid_date() -> ValidationError {
    ValidationError::new("invalid_date").with_message(Cow::from("must be an ISO-8601 date"))
}

/// Store-agnostic search criteria. Every populated field narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCriteria {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    /// `startDate >= start_from`
    pub start_from: Option<DateTime<Utc>>,
    /// `dueDate <= due_until`
    pub due_until: Option<DateTime<Utc>>,
    /// Literal, case-insensitive substring of title or description
    pub keyword: Option<String>,
    /// `None` keeps creation order
    pub sort: Option<TaskSort>,
}
