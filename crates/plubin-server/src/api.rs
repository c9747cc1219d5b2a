//! Shared API plumbing: the error type, blocking database access, and the
//! small read-only endpoints.

use crate::{storage::public_object_url, AppState};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use plubin_catalog::{list_policies, CatalogError, PolicyRule};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::PermissionDenied { .. } => ApiError::Forbidden(err.to_string()),
            CatalogError::NotNullViolation { .. }
            | CatalogError::InvalidInput(_)
            | CatalogError::Serialization(_) => ApiError::BadRequest(err.to_string()),
            CatalogError::ForeignKeyViolation(_) | CatalogError::Duplicate(_) => {
                ApiError::Conflict(err.to_string())
            }
            CatalogError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CatalogError::Database(ref e) => {
                tracing::error!(error = %e, "catalog database failure");
                ApiError::InternalServerError("database error".to_string())
            }
        }
    }
}

/// Runs `f` with a pooled connection on the blocking thread pool.
pub(crate) async fn with_conn<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        f(&conn)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))?
}

/// Handler for `GET /api/policies`.
///
/// Lists the installed access policies. Readable by every principal.
pub async fn list_policies_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<PolicyRule>>, ApiError> {
    let policies = with_conn(&state, |conn| Ok(list_policies(conn)?)).await?;
    Ok(Json(policies))
}

/// Response body for storage URL lookups.
#[derive(Debug, Serialize)]
pub struct StorageUrlResponse {
    pub bucket: String,
    pub path: String,
    pub url: String,
}

/// Handler for `GET /api/storage/{*path}`.
pub async fn storage_url_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<StorageUrlResponse>, ApiError> {
    let url = public_object_url(&state.storage, &path)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid object path: {path}")))?;

    Ok(Json(StorageUrlResponse {
        bucket: state.storage.bucket.clone(),
        path: path.trim_start_matches('/').to_string(),
        url,
    }))
}
