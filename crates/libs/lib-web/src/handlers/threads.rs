//! # Thread Handlers
//!
//! ## Endpoints
//!
//! - `POST /api/v1/threads/` - Create a thread for an existing user
//! - `GET /api/v1/threads/{thread_id}` - Thread with its messages
//! - `GET /api/v1/users/{user_id}/threads/` - All threads of a user

use super::load_thread_responses;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use lib_core::dto::{ThreadCreate, ThreadResponse};
use lib_core::model::store::{MessageRepository, ThreadForCreate, ThreadRepository, UserRepository};
use lib_core::{AppError, DbPool, Result};
use lib_utils::{validate_max_length, validate_not_empty};
use tracing::{info, instrument};

pub const MAX_THREAD_TITLE_LENGTH: usize = 100;

#[instrument(skip(db, req), fields(user_id = req.user_id))]
pub async fn create_thread(
    State(db): State<DbPool>,
    Json(req): Json<ThreadCreate>,
) -> Result<(StatusCode, Json<ThreadResponse>)> {
    let title = req.title.trim();
    validate_not_empty(title, "Thread title").map_err(AppError::InvalidInput)?;
    validate_max_length(title, MAX_THREAD_TITLE_LENGTH, "Thread title").map_err(AppError::InvalidInput)?;

    if UserRepository::find_by_id(&db, req.user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let thread = ThreadRepository::create(&db, ThreadForCreate::new(title, req.user_id)).await?;
    info!(thread_id = thread.id, title = %thread.title, user_id = thread.user_id, "Thread created");

    Ok((StatusCode::CREATED, Json(ThreadResponse::new(&thread, &[]))))
}

#[instrument(skip(db))]
pub async fn get_thread(State(db): State<DbPool>, Path(thread_id): Path<i64>) -> Result<Json<ThreadResponse>> {
    let thread = ThreadRepository::find_by_id(&db, thread_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Thread not found".to_string()))?;
    let messages = MessageRepository::list_for_thread(&db, thread.id).await?;

    Ok(Json(ThreadResponse::new(&thread, &messages)))
}

/// Unknown users simply have no threads.
#[instrument(skip(db))]
pub async fn list_user_threads(
    State(db): State<DbPool>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ThreadResponse>>> {
    let threads = load_thread_responses(&db, user_id).await?;
    info!(user_id, thread_count = threads.len(), "Retrieved user threads");
    Ok(Json(threads))
}
