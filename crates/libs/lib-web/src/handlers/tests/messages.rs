//! # Message Endpoint Tests

use super::*;
use crate::chat::outbound_channel;
use axum::extract::ws::Message as WsMessage;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_post_message_stores_reply() {
    // Arrange
    let (app, _) = test_app().await;
    let (_, thread_id) = create_user_and_thread(&app, "heidi").await;
    let uri = format!("/api/v1/threads/{}/messages/", thread_id);

    // Act
    let (status, body) = send(&app, "POST", &uri, Some(json!({ "content": "Hello there" }))).await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "Hello there");
    assert_eq!(body["role"], "user");
    assert_eq!(body["thread_id"], thread_id);

    let (status, messages) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["id"], body["id"]);
    assert_eq!(messages[1]["role"], "assistant");
}

#[tokio::test]
async fn test_post_assistant_message_gets_no_reply() {
    let (app, _) = test_app().await;
    let (_, thread_id) = create_user_and_thread(&app, "ivan").await;
    let uri = format!("/api/v1/threads/{}/messages/", thread_id);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "content": "Note", "role": "assistant" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "assistant");

    let (_, messages) = send(&app, "GET", &uri, None).await;
    assert_eq!(messages.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_post_message_validation() {
    let (app, _) = test_app().await;
    let (_, thread_id) = create_user_and_thread(&app, "judy").await;
    let uri = format!("/api/v1/threads/{}/messages/", thread_id);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "content": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidInput");

    let (status, _) = send(&app, "POST", &uri, Some(json!({ "content": "x", "role": "system" }))).await;
    assert!(status.is_client_error());

    let (_, messages) = send(&app, "GET", &uri, None).await;
    assert_eq!(messages, json!([]));
}

#[tokio::test]
async fn test_post_message_to_missing_thread_is_404() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "POST", "/api/v1/threads/999999/messages/", Some(json!({ "content": "hi" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Thread not found");

    let (status, _) = send(&app, "GET", "/api/v1/threads/999999/messages/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_posted_messages_reach_live_subscribers() {
    // Arrange
    let (app, state) = test_app().await;
    let (_, thread_id) = create_user_and_thread(&app, "mallory").await;
    let (tx, mut rx) = outbound_channel();
    state.chat.registry().register(thread_id, Uuid::new_v4(), tx);

    // Act
    let uri = format!("/api/v1/threads/{}/messages/", thread_id);
    send(&app, "POST", &uri, Some(json!({ "content": "broadcast me" }))).await;

    // Assert
    let mut roles = Vec::new();
    while let Ok(WsMessage::Text(text)) = rx.try_recv() {
        let envelope: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(envelope["type"], "message");
        roles.push(envelope["data"]["role"].as_str().unwrap().to_string());
    }
    assert_eq!(roles, vec!["user", "assistant"]);
}
