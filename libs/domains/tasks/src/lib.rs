//! Tasks Domain
//!
//! Task management backed by MongoDB: CRUD with image uploads, keyword
//! search, filtering and sorting, bulk delete, and simple statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, multipart/JSON extraction
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌─────────────┐
//! │   Service   │ ──▶ │ ImageStore  │  ← Uploaded images on disk
//! └──────┬──────┘     └─────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + MongoDB implementation)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, forms, query criteria
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_tasks::{
//!     handlers,
//!     mongodb::MongoTaskRepository,
//!     service::TaskService,
//!     storage::DiskImageStore,
//! };
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("task_manager_db");
//!
//! let repository = MongoTaskRepository::new(db);
//! let images = DiskImageStore::new("public/images");
//! let service = TaskService::new(repository, Arc::new(images));
//!
//! let router = axum::Router::new().nest("/task", handlers::router(service));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod form;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod query;
pub mod repository;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use error::{TaskError, TaskResult};
pub use form::{CreateTaskForm, PublicBaseUrl, TaskUpload, UpdateTaskForm};
pub use handlers::ApiDoc;
pub use models::{
    CreateTask, StatsBody, Task, TaskCategory, TaskPage, TaskPriority, TaskStatus, UpdateTask,
};
pub use crate::mongodb::MongoTaskRepository;
pub use query::{FilterQuery, PageQuery, Pagination, SearchQuery, TaskCriteria};
pub use repository::TaskRepository;
pub use service::{TaskService, TaskServiceConfig};
pub use storage::{DiskImageStore, ImageStore, UploadedImage};
