//! Post handlers, including tagged post creation.

use crate::api::{envelope, message, with_conn, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    Json,
};
use quire_content::{
    delete_post, get_post_detail, list_posts, list_posts_by_category, list_posts_by_tag,
    parse_tag_list, publish_post, update_post, NewPost, PostChanges,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Body of `POST /api/posts`.
///
/// `tags` is comma-separated free text; a missing or blank value files the
/// post under the default tag.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    /// Post body (HTML).
    pub post: String,
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub post: Option<String>,
}

/// GET /api/posts
pub async fn list_posts_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let posts = with_conn(&state.pool, list_posts).await?;
    Ok(envelope(posts))
}

/// POST /api/posts
pub async fn create_post_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<Value>, ApiError> {
    let tag_names = parse_tag_list(payload.tags.as_deref());
    let post = NewPost {
        user_id: payload.user_id,
        category_id: payload.category_id,
        title: payload.title,
        html: payload.post,
    };

    let published =
        with_conn(&state.pool, move |conn| publish_post(conn, &post, &tag_names)).await?;

    Ok(envelope(json!({
        "id": published.post_id,
        "tags": published.tag_ids,
    })))
}

/// GET /api/posts/{id}
pub async fn get_post_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let detail = with_conn(&state.pool, move |conn| get_post_detail(conn, id)).await?;
    Ok(envelope(detail))
}

/// PUT /api/posts/{id}
pub async fn update_post_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Value>, ApiError> {
    let changes = PostChanges {
        category_id: payload.category_id,
        title: payload.title,
        html: payload.post,
    };
    with_conn(&state.pool, move |conn| update_post(conn, id, &changes)).await?;
    Ok(message("Post updated"))
}

/// DELETE /api/posts/{id}
pub async fn delete_post_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    with_conn(&state.pool, move |conn| delete_post(conn, id)).await?;
    Ok(message("Post successfully deleted"))
}

/// GET /api/posts/category/{id}
pub async fn posts_by_category_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let posts = with_conn(&state.pool, move |conn| {
        list_posts_by_category(conn, category_id)
    })
    .await?;
    Ok(envelope(posts))
}

/// GET /api/posts/tag/{slug}
pub async fn posts_by_tag_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let posts = with_conn(&state.pool, move |conn| list_posts_by_tag(conn, &slug)).await?;
    Ok(envelope(posts))
}
