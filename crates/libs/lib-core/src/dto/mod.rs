//! # Data Transfer Objects (DTOs)
//!
//! Request and response structures shared by the REST API and the WebSocket feed.

pub mod chat;

pub use chat::*;
