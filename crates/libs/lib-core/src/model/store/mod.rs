//! # Database Store
//!
//! Database connection pool, migrations, repositories, and the message store
//! used by live chat sessions.

// region: --- Modules
pub mod models;
pub mod user_repository;
pub mod thread_repository;
pub mod message_repository;
pub mod message_store;
// endregion: --- Modules

// region: --- Re-exports
pub use models::{Message, MessageForCreate, ParseRoleError, Role, Thread, ThreadForCreate, User};
pub use user_repository::UserRepository;
pub use thread_repository::ThreadRepository;
pub use message_repository::MessageRepository;
pub use message_store::{MessageStore, SqliteMessageStore, StoreSession};
// endregion: --- Re-exports

// region: --- Types and Functions
use crate::Config;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::time::Duration;

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Schema migrations, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a new SQLite connection pool sized from configuration.
pub async fn create_pool(config: &Config) -> anyhow::Result<DbPool> {
    let options = config
        .database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_pool_size)
        .acquire_timeout(Duration::from_secs(config.db_pool_timeout_secs))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Apply all pending schema migrations.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}
// endregion: --- Types and Functions

// endregion: --- Test Support
