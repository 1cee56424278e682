//! # User Repository
//!
//! Provides database access layer for user-related operations.
//!
//! Every function accepts any SQLite executor: the shared pool for request
//! handlers, or a connection held exclusively by a chat session.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use lib_core::model::store::UserRepository;
//! # async fn example(pool: lib_core::DbPool) -> Result<(), sqlx::Error> {
//! let user = UserRepository::create(&pool, "alice").await?;
//! let found = UserRepository::find_by_name(&pool, "alice").await?;
//! assert_eq!(found.map(|u| u.id), Some(user.id));
//! # Ok(())
//! # }
//! ```

use super::models::User;
use sqlx::{query_as, query_scalar, SqliteExecutor};
use tracing::info;

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    /// Find a user by ID.
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, User>("SELECT id, name FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a user by their (unique) name.
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<User>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, User>("SELECT id, name FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the name already exists (UNIQUE constraint) or the
    /// database connection fails.
    pub async fn create<'e, E>(executor: E, name: &str) -> Result<User, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, User>("INSERT INTO users (name) VALUES (?) RETURNING id, name")
            .bind(name)
            .fetch_one(executor)
            .await
    }

    /// Count all users.
    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
    }

    /// Create `name` if the user table is empty. Returns the created user, if any.
    pub async fn seed_if_empty(pool: &super::DbPool, name: &str) -> Result<Option<User>, sqlx::Error> {
        if Self::count(pool).await? > 0 {
            return Ok(None);
        }

        let user = Self::create(pool, name).await?;
        info!(user_id = user.id, user_name = %user.name, "Seeded default user");
        Ok(Some(user))
    }
}

// endregion: --- Tests
