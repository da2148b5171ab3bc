//! User handlers.

use crate::api::{envelope, message, with_conn, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    Json,
};
use quire_content::{create_user, delete_user, get_user, list_users, update_user, NewUser, UserChanges};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

/// GET /api/users
pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let users = with_conn(&state.pool, list_users).await?;
    Ok(envelope(users))
}

/// POST /api/users
pub async fn create_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = NewUser {
        name: payload.name,
        email: payload.email,
    };
    let id = with_conn(&state.pool, move |conn| create_user(conn, &user)).await?;
    tracing::info!(user_id = id, "created user");
    Ok(envelope(json!({ "id": id })))
}

/// GET /api/users/{id}
pub async fn get_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let user = with_conn(&state.pool, move |conn| get_user(conn, id)).await?;
    Ok(envelope(user))
}

/// PUT /api/users/{id}
pub async fn update_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(changes): Json<UserChanges>,
) -> Result<Json<Value>, ApiError> {
    with_conn(&state.pool, move |conn| update_user(conn, id, &changes)).await?;
    Ok(message("User details updated"))
}

/// DELETE /api/users/{id}
pub async fn delete_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    with_conn(&state.pool, move |conn| delete_user(conn, id)).await?;
    Ok(message("User successfully deleted"))
}
