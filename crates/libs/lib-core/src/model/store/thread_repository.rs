//! # Thread Repository
//!
//! Create/read access to conversation threads.

use super::models::{Thread, ThreadForCreate};
use lib_utils::now_utc;
use sqlx::{query_as, SqliteExecutor};

const THREAD_COLUMNS: &str = "id, title, user_id, created_at, updated_at";

/// Thread repository for database operations.
pub struct ThreadRepository;

impl ThreadRepository {
    /// Find a thread by ID.
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Thread>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Thread>(&format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List all threads owned by a user, oldest first.
    pub async fn list_for_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<Thread>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Thread>(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads WHERE user_id = ? ORDER BY id ASC"
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Create a new thread.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the owning user does not exist (FOREIGN KEY constraint).
    pub async fn create<'e, E>(executor: E, thread: ThreadForCreate) -> Result<Thread, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = now_utc();
        query_as::<_, Thread>(&format!(
            "INSERT INTO threads (title, user_id, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING {THREAD_COLUMNS}"
        ))
        .bind(thread.title)
        .bind(thread.user_id)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }
}

// endregion: --- Tests
