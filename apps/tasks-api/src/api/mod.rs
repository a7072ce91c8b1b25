//! API routes module
//!
//! All HTTP routes of the task manager, mounted at the root for
//! compatibility with existing clients.

pub mod health;
pub mod tasks;

use axum::Router;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Create all API routes
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/task", tasks::router(state))
        .nest_service("/img", ServeDir::new(&state.config.upload.dir))
        .merge(health::router(state.clone()))
}
