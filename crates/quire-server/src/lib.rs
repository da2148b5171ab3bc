//! Quire HTTP server library logic.

pub mod api;
pub mod api_categories;
pub mod api_posts;
pub mod api_users;
pub mod config;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Router};
use quire_db::DbPool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
}

/// Maximum request body size (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/users",
            get(api_users::list_users_handler).post(api_users::create_user_handler),
        )
        .route(
            "/api/users/{id}",
            get(api_users::get_user_handler)
                .put(api_users::update_user_handler)
                .delete(api_users::delete_user_handler),
        )
        .route(
            "/api/categories",
            get(api_categories::list_categories_handler)
                .post(api_categories::create_category_handler),
        )
        .route(
            "/api/categories/{id}",
            get(api_categories::get_category_handler)
                .put(api_categories::update_category_handler)
                .delete(api_categories::delete_category_handler),
        )
        .route(
            "/api/posts",
            get(api_posts::list_posts_handler).post(api_posts::create_post_handler),
        )
        .route(
            "/api/posts/{id}",
            get(api_posts::get_post_handler)
                .put(api_posts::update_post_handler)
                .delete(api_posts::delete_post_handler),
        )
        .route(
            "/api/posts/category/{id}",
            get(api_posts::posts_by_category_handler),
        )
        .route(
            "/api/posts/tag/{slug}",
            get(api_posts::posts_by_tag_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}

/// Installs the global tracing subscriber from the logging config.
pub fn init_tracing(logging: &config::LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
