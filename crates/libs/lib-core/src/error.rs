//! # Centralized Error Handling
//!
//! This module defines the application-wide error type [`AppError`] used consistently
//! across all backend modules. It follows the `thiserror` pattern for ergonomic error handling.
//!
//! ## Error Categories
//!
//! 1. **Client Errors** (4xx) - User/input issues
//!    - [`InvalidInput`](AppError::InvalidInput) → 400 Bad Request
//!    - [`NotFound`](AppError::NotFound) → 404 Not Found
//!    - [`Conflict`](AppError::Conflict) → 409 Conflict
//!
//! 2. **Server Errors** (5xx) - Internal/system issues
//!    - [`Config`](AppError::Config) → 500 Internal Server Error
//!    - [`StoreUnavailable`](AppError::StoreUnavailable) → 503 Service Unavailable
//!    - [`Database`](AppError::Database) → 500 Internal Server Error
//!    - [`Generation`](AppError::Generation) → 502 Bad Gateway (response generator)
//!    - [`Internal`](AppError::Internal) → 500 Internal Server Error
//!
//! ## Usage Example
//!
//! ```rust
//! use lib_core::error::{AppError, Result};
//!
//! fn parse_title(title: &str) -> Result<String> {
//!     if title.trim().is_empty() {
//!         return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
//!     }
//!     Ok(title.trim().to_string())
//! }
//! ```
//!
//! ## Error Conversion
//!
//! - `From<anyhow::Error>` - Convert anyhow errors to AppError
//! - `From<sqlx::Error>` - Convert database errors to AppError, separating an unusable
//!   storage session ([`StoreUnavailable`](AppError::StoreUnavailable)) from query failures
//! - `From<serde_json::Error>` - Convert JSON errors to AppError

use thiserror::Error;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type covering all error scenarios.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error during startup or environment loading.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input validation error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (e.g. duplicate user name).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The storage session cannot be used at all (pool closed, timed out, I/O failure).
    ///
    /// A WebSocket session that hits this closes with code 4003.
    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    /// A query failed but the storage session is still usable.
    #[error("Database error: {0}")]
    Database(String),

    /// The response generator failed to produce a reply.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Internal server error (unexpected failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a user-friendly error message.
    ///
    /// For internal errors, returns a generic message to avoid exposing implementation details.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::StoreUnavailable(_) => "Storage temporarily unavailable".to_string(),
            AppError::Generation(_) => "Response generation failed".to_string(),
            AppError::Config(_) | AppError::Database(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Short machine-readable name of the variant.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Config",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::Database(_) => "Database",
            AppError::Generation(_) => "Generation",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Whether the storage session that produced this error can no longer be used.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

/// Implement Axum's `IntoResponse` for automatic error handling.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.user_message();

        // Full error text goes to the server log only
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Server error: {}", self);
        } else {
            tracing::debug!(error = %self, code = self.code(), "Client error: {}", self);
        }

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert `sqlx::Error` to `AppError`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Database record not found".to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => AppError::StoreUnavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                AppError::Database(db_err.message().to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

/// Convert `serde_json::Error` to `AppError`.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON error: {}", err))
    }
}

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_store_unavailable() {
        assert!(AppError::from(sqlx::Error::PoolTimedOut).is_store_unavailable());
        assert!(AppError::from(sqlx::Error::PoolClosed).is_store_unavailable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AppError::Database("UNIQUE constraint failed: users.name".to_string());
        assert_eq!(err.user_message(), "An internal error occurred");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err = AppError::NotFound("Thread not found".to_string());
        assert_eq!(err.user_message(), "Thread not found");
        assert_eq!(err.code(), "NotFound");
    }
}
// endregion: --- Tests
