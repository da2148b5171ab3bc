use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use quire_db::{blog_catalog, create_all_tables, create_pool, DbPool, DbRuntimeSettings};
use quire_server::{app, AppState};
use serde_json::Value;
use tower::ServiceExt;

/// Router over a migrated in-memory database.
pub fn setup_app() -> (Router, DbPool) {
    let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        create_all_tables(&conn, &blog_catalog().unwrap()).unwrap();
    }
    (app(AppState { pool: pool.clone() }), pool)
}

/// Sends a request and returns the status with the decoded JSON body.
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Creates a user and a category through the API, returning their ids.
#[allow(dead_code)]
pub async fn seed_author(app: &Router) -> (i64, i64) {
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        Some(serde_json::json!({"name": "Ada", "email": "ada@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        "POST",
        "/api/categories",
        Some(serde_json::json!({"name": "General"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (user_id, body["data"]["id"].as_i64().unwrap())
}
