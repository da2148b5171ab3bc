//! Shared pieces for the HTTP handlers: the response envelope, the error
//! type, and the blocking database helper.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quire_content::ContentError;
use quire_db::DbPool;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl From<ContentError> for ApiError {
    fn from(e: ContentError) -> Self {
        if e.is_constraint_violation() {
            tracing::warn!(error = %e, "write rejected by constraint");
            return ApiError::Conflict(e.to_string());
        }
        match e {
            ContentError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            ContentError::Persistence(ref err) => {
                tracing::error!(error = %err, "content operation failed");
                ApiError::InternalServerError(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, data) = match self {
            // Not-found responses carry no message.
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, json!({})),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "message": msg })),
            ApiError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": msg }))
            }
        };

        (status, Json(json!({ "error": true, "data": data }))).into_response()
    }
}

/// Wraps a successful payload in the `{"error": false, "data": ...}` envelope.
pub fn envelope<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "error": false, "data": data }))
}

/// Envelope carrying a human-readable confirmation message.
pub fn message(text: &str) -> Json<Value> {
    envelope(json!({ "message": text }))
}

/// Runs a content operation on a pooled connection on the blocking pool.
pub async fn with_conn<T, F>(pool: &DbPool, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, ContentError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection");
            ApiError::InternalServerError(format!("db connection failed: {}", e))
        })?;
        op(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "blocking task join error");
        ApiError::InternalServerError(format!("task join error: {}", e))
    })?
}

/// Health check handler.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
