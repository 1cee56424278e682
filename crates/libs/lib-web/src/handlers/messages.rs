//! # Message Handlers
//!
//! ## Endpoints
//!
//! - `POST /api/v1/threads/{thread_id}/messages/` - Post a message; user messages get a reply
//! - `GET /api/v1/threads/{thread_id}/messages/` - Thread messages in commit order
//!
//! Posted messages go through the same [`BroadcastCoordinator`](crate::chat::BroadcastCoordinator)
//! as WebSocket traffic, so live subscribers of the thread see them too.

use crate::chat::ChatAppState;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use lib_core::dto::{MessageCreate, MessageResponse};
use lib_core::model::store::{MessageRepository, Role, ThreadRepository};
use lib_core::{AppError, DbPool, Result};
use lib_utils::{validate_max_length, validate_not_empty};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Store a message and, for user messages, generate and store the reply.
///
/// Returns the posted message. A failed reply is logged; the posted message stays.
#[instrument(skip(chat, req), fields(content_len = req.content.len()))]
pub async fn create_message(
    State(chat): State<Arc<ChatAppState>>,
    Path(thread_id): Path<i64>,
    Json(req): Json<MessageCreate>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    validate_not_empty(&req.content, "Message content").map_err(AppError::InvalidInput)?;
    validate_max_length(&req.content, chat.settings.max_message_length, "Message content")
        .map_err(AppError::InvalidInput)?;
    let role = req.role.unwrap_or(Role::User);

    let mut store = chat.store.open_session().await?;
    if store.get_thread(thread_id).await?.is_none() {
        warn!(thread_id, "Thread not found");
        return Err(AppError::NotFound("Thread not found".to_string()));
    }

    let message = chat.coordinator.publish(store.as_mut(), thread_id, role, &req.content).await?;
    info!(thread_id, message_id = message.id, role = %role, "Message created");

    if role == Role::User {
        match chat
            .coordinator
            .reply(store.as_mut(), chat.generator.as_ref(), thread_id, &req.content)
            .await
        {
            Ok(reply) => info!(thread_id, message_id = reply.id, "Bot response created"),
            Err(e) => error!(thread_id, error = %e.source(), "{}", e.client_message()),
        }
    }

    Ok((StatusCode::CREATED, Json(MessageResponse::from(&message))))
}

#[instrument(skip(db))]
pub async fn list_messages(
    State(db): State<DbPool>,
    Path(thread_id): Path<i64>,
) -> Result<Json<Vec<MessageResponse>>> {
    if ThreadRepository::find_by_id(&db, thread_id).await?.is_none() {
        return Err(AppError::NotFound("Thread not found".to_string()));
    }

    let messages = MessageRepository::list_for_thread(&db, thread_id).await?;
    info!(thread_id, message_count = messages.len(), "Retrieved thread messages");
    Ok(Json(messages.iter().map(MessageResponse::from).collect()))
}
