use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TaskResult;
use crate::models::{CreateTask, Task, UpdateTask};
use crate::query::{Pagination, TaskCriteria};

/// Persistence interface for tasks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task, assigning its id and timestamps
    async fn create(&self, input: CreateTask) -> TaskResult<Task>;

    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>>;

    /// One page of tasks matching `criteria`
    async fn find(&self, criteria: TaskCriteria, page: Pagination) -> TaskResult<Vec<Task>>;

    /// Number of tasks matching `criteria`, ignoring pagination
    async fn count(&self, criteria: TaskCriteria) -> TaskResult<u64>;

    /// Apply a partial update atomically. `None` when the task does not exist.
    async fn update(&self, id: Uuid, input: UpdateTask) -> TaskResult<Option<Task>>;

    /// `false` when the task does not exist
    async fn delete(&self, id: Uuid) -> TaskResult<bool>;

    /// Delete every listed task, returning how many existed
    async fn delete_many(&self, ids: Vec<Uuid>) -> TaskResult<u64>;
}
