//! # Message Repository
//!
//! Append-only access to thread messages. History is returned in insertion
//! order, which for SQLite's single writer is also commit order.

use super::models::{Message, MessageForCreate};
use lib_utils::now_utc;
use sqlx::{query_as, query_scalar, SqliteExecutor};

const MESSAGE_COLUMNS: &str = "id, thread_id, role, content, created_at";

/// Message repository for database operations.
pub struct MessageRepository;

impl MessageRepository {
    /// Persist a message and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the thread does not exist (FOREIGN KEY constraint)
    /// or the content is empty (CHECK constraint).
    pub async fn create<'e, E>(executor: E, message: MessageForCreate) -> Result<Message, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Message>(&format!(
            "INSERT INTO messages (thread_id, role, content, created_at) VALUES (?, ?, ?, ?) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message.thread_id)
        .bind(message.role.as_str())
        .bind(message.content)
        .bind(now_utc())
        .fetch_one(executor)
        .await
    }

    /// All messages of a thread in insertion order.
    pub async fn list_for_thread<'e, E>(executor: E, thread_id: i64) -> Result<Vec<Message>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_id = ? ORDER BY id ASC"
        ))
        .bind(thread_id)
        .fetch_all(executor)
        .await
    }

    /// Number of messages stored for a thread.
    pub async fn count_for_thread<'e, E>(executor: E, thread_id: i64) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(executor)
            .await
    }
}

// endregion: --- Tests
