//! Custom extractors for Axum handlers.

pub mod query_params;
pub mod uuid_path;

pub use query_params::QueryParams;
pub use uuid_path::UuidPath;
