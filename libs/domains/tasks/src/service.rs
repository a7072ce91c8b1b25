//! Task Service - Business logic layer

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::error::{TaskError, TaskResult};
use crate::form::{CreateTaskForm, PublicBaseUrl, UpdateTaskForm};
use crate::models::{
    StatKey, StatsBody, Task, TaskCategory, TaskPage, TaskPriority, TaskStatus, UpdateTask,
};
use crate::query::{
    DEFAULT_MAX_PAGE_SIZE, FilterQuery, PageQuery, Pagination, SearchQuery, TaskCriteria,
};
use crate::repository::TaskRepository;
use crate::storage::{ImageStore, UploadedImage};

/// Tunables for [`TaskService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskServiceConfig {
    /// Upper bound applied to `pageSize`
    pub max_page_size: u64,
    /// Return statistics with the `"<value> Tasks"` dynamic keys
    pub legacy_stats_labels: bool,
    /// Overrides the request-derived base of image URLs
    pub public_base_url: Option<String>,
    /// Build image URLs from `X-Forwarded-*` headers when no override is set
    pub trust_forwarded_headers: bool,
}

impl Default for TaskServiceConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            legacy_stats_labels: false,
            public_base_url: None,
            trust_forwarded_headers: false,
        }
    }
}

/// Task service providing business logic operations
///
/// Validates request forms before any side effect, stores uploaded images,
/// and shapes paginated and statistics responses.
pub struct TaskService<R: TaskRepository> {
    repository: Arc<R>,
    images: Arc<dyn ImageStore>,
    config: TaskServiceConfig,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repository: R, images: Arc<dyn ImageStore>) -> Self {
        Self {
            repository: Arc::new(repository),
            images,
            config: TaskServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TaskServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TaskServiceConfig {
        &self.config
    }

    /// Create a task, storing the image only once the form is valid
    #[instrument(skip(self, form, image, base_url))]
    pub async fn create_task(
        &self,
        form: CreateTaskForm,
        image: Option<UploadedImage>,
        base_url: &PublicBaseUrl,
    ) -> TaskResult<Task> {
        check_form(form.validate(), image.as_ref())?;

        let stored = self.store_image(image, base_url).await?;
        let result = match form.into_create(stored.as_ref().map(|s| s.url.clone())) {
            Ok(input) => self.repository.create(input).await,
            Err(e) => Err(e),
        };
        self.discard_on_error(stored, result).await
    }

    #[instrument(skip(self))]
    pub async fn list_tasks(&self, query: &PageQuery) -> TaskResult<TaskPage> {
        let pagination = query.pagination(self.config.max_page_size);
        self.page_of(TaskCriteria::default(), pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get_task(&self, id: Uuid) -> TaskResult<Task> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Partially update a task. Invalid input never reaches the repository.
    #[instrument(skip(self, form, image, base_url))]
    pub async fn update_task(
        &self,
        id: Uuid,
        form: UpdateTaskForm,
        image: Option<UploadedImage>,
        base_url: &PublicBaseUrl,
    ) -> TaskResult<Task> {
        check_form(form.validate(), image.as_ref())?;

        let stored = self.store_image(image, base_url).await?;
        let result = match form.into_update(stored.as_ref().map(|s| s.url.clone())) {
            Ok(input) => self
                .repository
                .update(id, input)
                .await
                .and_then(|task| task.ok_or(TaskError::NotFound(id))),
            Err(e) => Err(e),
        };
        self.discard_on_error(stored, result).await
    }

    /// Set status to Done (and with it the completion flag)
    #[instrument(skip(self))]
    pub async fn mark_done(&self, id: Uuid) -> TaskResult<Task> {
        self.repository
            .update(id, UpdateTask::mark_done())
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: Uuid) -> TaskResult<()> {
        if self.repository.delete(id).await? {
            Ok(())
        } else {
            Err(TaskError::NotFound(id))
        }
    }

    /// Delete every listed task and report how many existed
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn delete_tasks(&self, ids: Vec<Uuid>) -> TaskResult<u64> {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = ids.into_iter().filter(|id| seen.insert(*id)).collect();

        self.repository.delete_many(ids).await
    }

    #[instrument(skip(self))]
    pub async fn search_tasks(&self, query: &SearchQuery) -> TaskResult<TaskPage> {
        let criteria = query.criteria()?;
        let pagination = query.pagination(self.config.max_page_size);
        self.page_of(criteria, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn filter_tasks(&self, query: &FilterQuery) -> TaskResult<TaskPage> {
        let criteria = query.criteria()?;
        let pagination = query.pagination(self.config.max_page_size);
        self.page_of(criteria, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn total_task_count(&self) -> TaskResult<u64> {
        self.repository.count(TaskCriteria::default()).await
    }

    #[instrument(skip(self))]
    pub async fn status_stats(&self, raw: &str) -> TaskResult<StatsBody> {
        let status = parse_path_value::<TaskStatus>("status", raw)?;
        self.stats(StatKey::Status(status)).await
    }

    #[instrument(skip(self))]
    pub async fn priority_stats(&self, raw: &str) -> TaskResult<StatsBody> {
        let priority = parse_path_value::<TaskPriority>("priority", raw)?;
        self.stats(StatKey::Priority(priority)).await
    }

    #[instrument(skip(self))]
    pub async fn category_stats(&self, raw: &str) -> TaskResult<StatsBody> {
        let category = parse_path_value::<TaskCategory>("category", raw)?;
        self.stats(StatKey::Category(category)).await
    }

    async fn stats(&self, key: StatKey) -> TaskResult<StatsBody> {
        let criteria = match key {
            StatKey::Status(status) => TaskCriteria {
                status: Some(status),
                ..Default::default()
            },
            StatKey::Priority(priority) => TaskCriteria {
                priority: Some(priority),
                ..Default::default()
            },
            StatKey::Category(category) => TaskCriteria {
                category: Some(category),
                ..Default::default()
            },
        };

        let (count, total) = tokio::try_join!(
            self.repository.count(criteria),
            self.repository.count(TaskCriteria::default()),
        )?;

        Ok(StatsBody::new(
            key,
            count,
            total,
            self.config.legacy_stats_labels,
        ))
    }

    async fn page_of(&self, criteria: TaskCriteria, pagination: Pagination) -> TaskResult<TaskPage> {
        let (data, total_count) = tokio::try_join!(
            self.repository.find(criteria.clone(), pagination),
            self.repository.count(criteria),
        )?;

        Ok(TaskPage {
            page: pagination.page,
            page_size: pagination.page_size,
            total_items: data.len(),
            total_count,
            data,
        })
    }

    async fn store_image(
        &self,
        image: Option<UploadedImage>,
        base_url: &PublicBaseUrl,
    ) -> TaskResult<Option<StoredImage>> {
        let Some(image) = image else {
            return Ok(None);
        };

        let name = self.images.save(image).await?;
        let base = self
            .config
            .public_base_url
            .as_deref()
            .unwrap_or_else(|| base_url.resolve(self.config.trust_forwarded_headers))
            .trim_end_matches('/');
        let url = format!("{}/img/{}", base, name);
        Ok(Some(StoredImage { name, url }))
    }

    /// Remove a freshly stored image when the write it belonged to failed.
    async fn discard_on_error(
        &self,
        stored: Option<StoredImage>,
        result: TaskResult<Task>,
    ) -> TaskResult<Task> {
        if let (Err(_), Some(stored)) = (&result, stored) {
            if let Err(e) = self.images.remove(&stored.name).await {
                tracing::warn!(name = %stored.name, error = %e, "Failed to remove orphaned image");
            }
        }
        result
    }
}

struct StoredImage {
    name: String,
    url: String,
}

impl<R: TaskRepository> Clone for TaskService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            images: Arc::clone(&self.images),
            config: self.config.clone(),
        }
    }
}

/// Merge form and image failures into a single validation error.
fn check_form(
    form: Result<(), ValidationErrors>,
    image: Option<&UploadedImage>,
) -> TaskResult<()> {
    let mut errors = form.err().unwrap_or_else(ValidationErrors::new);

    if let Some(Err(e)) = image.map(UploadedImage::check_content_type) {
        errors.add("image", e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TaskError::Validation(errors))
    }
}

fn parse_path_value<E: FromStr>(field: &str, raw: &str) -> TaskResult<E> {
    E::from_str(raw.trim())
        .map_err(|_| TaskError::InvalidInput(format!("Invalid {}: {}", field, raw)))
}
