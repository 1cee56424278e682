//! # Message Store
//!
//! The storage seam used by live chat sessions.
//!
//! A [`MessageStore`] hands out [`StoreSession`]s. Each session owns one pooled
//! connection for its whole lifetime and gives it back when dropped, so a chat
//! connection releases its storage handle on every exit path without explicit
//! cleanup code.

use super::models::{Message, MessageForCreate, Role, Thread};
use super::{DbPool, MessageRepository, ThreadRepository};
use crate::Result;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;
use tracing::debug;

/// Factory for exclusively owned storage sessions.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Acquire a storage session.
    ///
    /// Fails with [`AppError::StoreUnavailable`](crate::AppError::StoreUnavailable)
    /// when no session can be obtained.
    async fn open_session(&self) -> Result<Box<dyn StoreSession>>;
}

/// Create/read operations on threads and messages, bound to one storage handle.
#[async_trait]
pub trait StoreSession: Send {
    /// Look up a thread; `Ok(None)` when it does not exist.
    async fn get_thread(&mut self, thread_id: i64) -> Result<Option<Thread>>;

    /// All messages of a thread in commit order.
    async fn get_thread_messages(&mut self, thread_id: i64) -> Result<Vec<Message>>;

    /// Persist a message. Returns only after the write is durable.
    async fn create_message(&mut self, content: &str, role: Role, thread_id: i64) -> Result<Message>;
}

/// [`MessageStore`] backed by the SQLite pool.
#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: DbPool,
}

impl SqliteMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn open_session(&self) -> Result<Box<dyn StoreSession>> {
        let conn = self.pool.acquire().await?;
        debug!(pool_size = self.pool.size(), idle = self.pool.num_idle(), "Storage session acquired");
        Ok(Box::new(SqliteStoreSession { conn }))
    }
}

/// One pooled connection; returned to the pool on drop.
pub struct SqliteStoreSession {
    conn: PoolConnection<Sqlite>,
}

#[async_trait]
impl StoreSession for SqliteStoreSession {
    async fn get_thread(&mut self, thread_id: i64) -> Result<Option<Thread>> {
        Ok(ThreadRepository::find_by_id(&mut *self.conn, thread_id).await?)
    }

    async fn get_thread_messages(&mut self, thread_id: i64) -> Result<Vec<Message>> {
        Ok(MessageRepository::list_for_thread(&mut *self.conn, thread_id).await?)
    }

    async fn create_message(&mut self, content: &str, role: Role, thread_id: i64) -> Result<Message> {
        let message = MessageForCreate::new(thread_id, role, content);
        Ok(MessageRepository::create(&mut *self.conn, message).await?)
    }
}

impl Drop for SqliteStoreSession {
    fn drop(&mut self) {
        debug!("Storage session released");
    }
}

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::test_support::{seed_thread, setup_test_db};

    #[tokio::test]
    async fn test_session_reads_and_writes() {
        let pool = setup_test_db().await;
        let thread = seed_thread(&pool).await;
        let store = SqliteMessageStore::new(pool.clone());

        let mut session = store.open_session().await.unwrap();
        assert!(session.get_thread(thread.id).await.unwrap().is_some());
        assert!(session.get_thread(thread.id + 1000).await.unwrap().is_none());

        let stored = session.create_message("hello", Role::User, thread.id).await.unwrap();
        assert_eq!(stored.thread_id, thread.id);
        assert_eq!(stored.role, Role::User);

        let history = session.get_thread_messages(thread.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, stored.id);
    }

    #[tokio::test]
    async fn test_closed_pool_is_store_unavailable() {
        let pool = setup_test_db().await;
        let store = SqliteMessageStore::new(pool.clone());
        pool.close().await;

        let err = match store.open_session().await {
            Ok(_) => panic!("closed pool must not hand out sessions"),
            Err(e) => e,
        };
        assert!(err.is_store_unavailable());
    }
}
// endregion: --- Tests
