//! # HTTP Request Handlers
//!
//! Axum handlers organized by resource. All REST routes live under `/api/v1`.
//!
//! ## Handler Modules
//!
//! - **[`users`]**: `POST /users/`, `GET /users/{user_id}`
//! - **[`threads`]**: `POST /threads/`, `GET /threads/{thread_id}`, `GET /users/{user_id}/threads/`
//! - **[`messages`]**: `POST /threads/{thread_id}/messages/`, `GET /threads/{thread_id}/messages/`
//! - **[`websocket`]**: `GET /ws/threads/{thread_id}` (outside `/api/v1`)
//!
//! ## Error Handling
//!
//! Handlers return [`lib_core::Result`]; an [`AppError`](lib_core::AppError) renders as
//! `{"error": "...", "code": "..."}` with the matching status code.

pub mod messages;
pub mod threads;
pub mod users;
pub mod websocket;

#[cfg(test)]
mod tests;

use lib_core::dto::ThreadResponse;
use lib_core::model::store::{MessageRepository, ThreadRepository};
use lib_core::{DbPool, Result};

/// All threads of a user, each with its messages.
pub(crate) async fn load_thread_responses(db: &DbPool, user_id: i64) -> Result<Vec<ThreadResponse>> {
    let threads = ThreadRepository::list_for_user(db, user_id).await?;
    let mut responses = Vec::with_capacity(threads.len());
    for thread in &threads {
        let messages = MessageRepository::list_for_thread(db, thread.id).await?;
        responses.push(ThreadResponse::new(thread, &messages));
    }
    Ok(responses)
}
