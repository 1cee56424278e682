use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// Conversation thread owned by a user.
#[derive(Debug, Clone, FromRow)]
pub struct Thread {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data structure for creating a new thread.
#[derive(Debug, Clone)]
pub struct ThreadForCreate {
    pub title: String,
    pub user_id: i64,
}

impl ThreadForCreate {
    /// Create a new `ThreadForCreate` instance.
    pub fn new(title: impl Into<String>, user_id: i64) -> Self {
        Self {
            title: title.into(),
            user_id,
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored or submitted role that is neither `user` nor `assistant`.
#[derive(Debug, Error)]
#[error("Invalid role: {0}")]
pub struct ParseRoleError(pub String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A single message in a thread. Never mutated once stored.
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: i64,
    pub thread_id: i64,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Data structure for creating a new message.
#[derive(Debug, Clone)]
pub struct MessageForCreate {
    pub thread_id: i64,
    pub role: Role,
    pub content: String,
}

impl MessageForCreate {
    /// Create a new `MessageForCreate` instance.
    pub fn new(thread_id: i64, role: Role, content: impl Into<String>) -> Self {
        Self {
            thread_id,
            role,
            content: content.into(),
        }
    }
}
