//! Image storage for task attachments.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use validator::ValidationError;

use crate::error::{TaskError, TaskResult};

/// Suffixes tried after the plain name is taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// An uploaded file as received from the client
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedImage {
    /// Only `image/*` content types are accepted.
    pub fn check_content_type(&self) -> Result<(), ValidationError> {
        match self.content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => Ok(()),
            _ => Err(ValidationError::new("invalid_image")
                .with_message(Cow::from("image must be an image/* file"))),
        }
    }
}

/// Persists uploaded images and returns the name they are served under.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, image: UploadedImage) -> TaskResult<String>;

    /// Delete an image by the name `save` returned. Missing files are not an error.
    async fn remove(&self, name: &str) -> TaskResult<()>;
}

/// Writes images into a local directory served at `/img`.
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the target directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> TaskResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Write under the first free name for `millis`, never replacing a file.
    async fn save_at(&self, image: &UploadedImage, millis: i64) -> TaskResult<String> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = numbered_file_name(&image.file_name, millis, attempt);
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
                .await;

            match opened {
                Ok(mut file) => {
                    file.write_all(&image.bytes).await?;
                    file.flush().await?;
                    return Ok(name);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(TaskError::Storage(format!(
            "no free file name for {}",
            image.file_name
        )))
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    #[instrument(skip(self, image), fields(file_name = %image.file_name, size = image.bytes.len()))]
    async fn save(&self, image: UploadedImage) -> TaskResult<String> {
        let name = self.save_at(&image, Utc::now().timestamp_millis()).await?;

        tracing::info!(stored_as = %name, "Image stored");
        Ok(name)
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> TaskResult<()> {
        if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(TaskError::Storage(format!("not a stored image name: {}", name)));
        }

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                tracing::info!(name, "Image removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `<sanitized original>-<millis><ext>`, e.g. `cat.png-1700000000000.png`.
pub fn stored_file_name(original: &str, millis: i64) -> String {
    numbered_file_name(original, millis, 0)
}

/// `stored_file_name` with `-<attempt>` after the timestamp when `attempt > 0`.
fn numbered_file_name(original: &str, millis: i64, attempt: u32) -> String {
    let base = sanitize(original);
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", sanitize(ext)))
        .unwrap_or_default();

    if attempt == 0 {
        format!("{}-{}{}", base, millis, extension)
    } else {
        format!("{}-{}-{}{}", base, millis, attempt, extension)
    }
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
