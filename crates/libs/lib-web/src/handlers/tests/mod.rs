//! # Handler Tests
//!
//! REST endpoints exercised through the full router (middleware included)
//! against an in-memory database.

mod messages;
mod threads;

use crate::chat::SimpleChatbot;
use crate::server::{create_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use lib_core::model::store::run_migrations;
use lib_core::{Config, DbPool};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

/// Setup test database with schema
pub async fn setup_test_db() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    run_migrations(&pool).await.expect("Failed to run migrations");

    pool
}

/// Create test app with routes
pub async fn test_app() -> (Router, AppState) {
    let pool = setup_test_db().await;
    let state = AppState::new(pool, Config::default(), Arc::new(SimpleChatbot::new()));
    (create_router(state.clone()), state)
}

/// Send a request and decode the JSON body (`Value::Null` when empty).
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// Create a user and a thread through the API; returns `(user_id, thread_id)`.
pub async fn create_user_and_thread(app: &Router, name: &str) -> (i64, i64) {
    let (status, user) = send(app, "POST", "/api/v1/users/", Some(serde_json::json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_i64().unwrap();

    let (status, thread) = send(
        app,
        "POST",
        "/api/v1/threads/",
        Some(serde_json::json!({ "title": "First thread", "user_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (user_id, thread["id"].as_i64().unwrap())
}

#[tokio::test]
async fn test_root_and_health() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the Chatbot API");

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "GET", "/api/v1/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NotFound");
}
