//! # Chat Data Transfer Objects
//!
//! Wire shapes for users, threads and messages. Timestamps are rendered as
//! ISO-8601 UTC with microseconds and a literal `Z`.

use crate::model::store::{Message, Role, Thread, User};
use lib_utils::format_time;
use serde::{Deserialize, Serialize};

/// Request body for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
}

/// Request body for creating a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadCreate {
    pub title: String,
    pub user_id: i64,
}

/// Request body for posting a message over REST.
///
/// `role` defaults to `user` when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreate {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// A stored message as seen by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub id: i64,
    pub content: String,
    pub role: Role,
    pub created_at: String,
    pub thread_id: i64,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            role: message.role,
            created_at: format_time(message.created_at),
            thread_id: message.thread_id,
        }
    }
}

/// A thread together with its messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub messages: Vec<MessageResponse>,
}

impl ThreadResponse {
    pub fn new(thread: &Thread, messages: &[Message]) -> Self {
        Self {
            id: thread.id,
            title: thread.title.clone(),
            user_id: thread.user_id,
            created_at: format_time(thread.created_at),
            updated_at: format_time(thread.updated_at),
            messages: messages.iter().map(MessageResponse::from).collect(),
        }
    }
}

/// A user together with their threads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub threads: Vec<ThreadResponse>,
}

impl UserResponse {
    pub fn new(user: &User, threads: Vec<ThreadResponse>) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            threads,
        }
    }
}
