//! # User Handlers
//!
//! ## Endpoints
//!
//! - `POST /api/v1/users/` - Create a user
//! - `GET /api/v1/users/{user_id}` - User with all threads and their messages

use super::load_thread_responses;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use lib_core::dto::{UserCreate, UserResponse};
use lib_core::model::store::UserRepository;
use lib_core::{AppError, DbPool, Result};
use lib_utils::{validate_max_length, validate_not_empty};
use tracing::{info, instrument, warn};

pub const MAX_USER_NAME_LENGTH: usize = 30;

#[instrument(skip(db, req), fields(name = %req.name))]
pub async fn create_user(
    State(db): State<DbPool>,
    Json(req): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let name = req.name.trim();
    validate_not_empty(name, "User name").map_err(AppError::InvalidInput)?;
    validate_max_length(name, MAX_USER_NAME_LENGTH, "User name").map_err(AppError::InvalidInput)?;

    if UserRepository::find_by_name(&db, name).await?.is_some() {
        warn!(name, "User already exists");
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let user = UserRepository::create(&db, name).await.map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("User already exists".to_string())
        }
        other => AppError::from(other),
    })?;

    info!(user_id = user.id, name = %user.name, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::new(&user, Vec::new()))))
}

#[instrument(skip(db))]
pub async fn get_user(State(db): State<DbPool>, Path(user_id): Path<i64>) -> Result<Json<UserResponse>> {
    let user = UserRepository::find_by_id(&db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let threads = load_thread_responses(&db, user.id).await?;
    Ok(Json(UserResponse::new(&user, threads)))
}
