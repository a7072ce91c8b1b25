//! Tasks API routes
//!
//! Wires the tasks domain to MongoDB and the upload directory.

use axum::{Router, extract::DefaultBodyLimit};
use domain_tasks::{DiskImageStore, MongoTaskRepository, TaskService, TaskServiceConfig, handlers};
use mongodb::Database;
use std::sync::Arc;
use tracing::info;

use crate::config::UploadConfig;
use crate::state::AppState;

/// Create indexes on the `tasks` collection
pub async fn init_indexes(db: &Database) -> eyre::Result<()> {
    MongoTaskRepository::new(db.clone()).ensure_indexes().await?;
    Ok(())
}

/// Make sure uploaded images have somewhere to go
pub async fn ensure_upload_dir(upload: &UploadConfig) -> eyre::Result<()> {
    DiskImageStore::new(&upload.dir).ensure_dir().await?;
    info!(dir = %upload.dir.display(), "Upload directory ready");
    Ok(())
}

/// Create tasks router
pub fn router(state: &AppState) -> Router {
    let repository = MongoTaskRepository::new(state.db.clone());
    let images = DiskImageStore::new(&state.config.upload.dir);

    let service = TaskService::new(repository, Arc::new(images))
        .with_config(TaskServiceConfig::from(&state.config.tasks));

    handlers::router(service).layer(DefaultBodyLimit::max(state.config.upload.max_bytes))
}
