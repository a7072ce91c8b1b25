//! Query string extractor whose rejection is an [`ErrorResponse`](crate::ErrorResponse).

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

/// Like [`Query`], but a malformed query string answers with
/// `400 QUERY_EXTRACTION` JSON instead of plain text.
///
/// ```ignore
/// async fn list(QueryParams(query): QueryParams<PageQuery>) -> String {
///     format!("{:?}", query)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}
