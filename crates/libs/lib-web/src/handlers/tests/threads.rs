//! # Thread Endpoint Tests

use super::*;
use serde_json::json;

#[tokio::test]
async fn test_create_thread_success() {
    // Arrange
    let (app, _) = test_app().await;
    let (_, user) = send(&app, "POST", "/api/v1/users/", Some(json!({ "name": "dave" }))).await;
    let user_id = user["id"].as_i64().unwrap();

    // Act
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/threads/",
        Some(json!({ "title": "Planning", "user_id": user_id })),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Planning");
    assert_eq!(body["user_id"], user_id);
    assert_eq!(body["messages"], json!([]));
    assert!(body["created_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_create_thread_for_missing_user_is_404() {
    let (app, _) = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/threads/",
        Some(json!({ "title": "Orphan", "user_id": 999 })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_create_thread_rejects_bad_titles() {
    let (app, _) = test_app().await;
    let (_, user) = send(&app, "POST", "/api/v1/users/", Some(json!({ "name": "erin" }))).await;
    let user_id = user["id"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", "/api/v1/threads/", Some(json!({ "title": "", "user_id": user_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let title = "t".repeat(101);
    let (status, _) = send(&app, "POST", "/api/v1/threads/", Some(json!({ "title": title, "user_id": user_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_thread_and_missing_thread() {
    let (app, _) = test_app().await;
    let (_, thread_id) = create_user_and_thread(&app, "frank").await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/threads/{}", thread_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], thread_id);

    let (status, _) = send(&app, "GET", "/api/v1/threads/999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_user_threads() {
    // Arrange
    let (app, _) = test_app().await;
    let (user_id, _) = create_user_and_thread(&app, "grace").await;
    send(&app, "POST", "/api/v1/threads/", Some(json!({ "title": "Second", "user_id": user_id }))).await;

    // Act
    let (status, body) = send(&app, "GET", &format!("/api/v1/users/{}/threads/", user_id), None).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body.as_array().unwrap().iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["First thread", "Second"]);

    let (status, body) = send(&app, "GET", "/api/v1/users/777/threads/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
