//! Category handlers.

use crate::api::{envelope, message, with_conn, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    Json,
};
use quire_content::{
    create_category, delete_category, get_category, list_categories, update_category,
    CategoryChanges, NewCategory,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /api/categories
pub async fn list_categories_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let categories = with_conn(&state.pool, list_categories).await?;
    Ok(envelope(categories))
}

/// POST /api/categories
pub async fn create_category_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<NewCategory>,
) -> Result<Json<Value>, ApiError> {
    let id = with_conn(&state.pool, move |conn| create_category(conn, &payload)).await?;
    tracing::info!(category_id = id, "created category");
    Ok(envelope(json!({ "id": id })))
}

/// GET /api/categories/{id}
pub async fn get_category_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let category = with_conn(&state.pool, move |conn| get_category(conn, id)).await?;
    Ok(envelope(category))
}

/// PUT /api/categories/{id}
pub async fn update_category_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(changes): Json<CategoryChanges>,
) -> Result<Json<Value>, ApiError> {
    with_conn(&state.pool, move |conn| update_category(conn, id, &changes)).await?;
    Ok(message("Category updated"))
}

/// DELETE /api/categories/{id}
pub async fn delete_category_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    with_conn(&state.pool, move |conn| delete_category(conn, id)).await?;
    Ok(message("Category successfully deleted"))
}
