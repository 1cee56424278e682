//! # Web Library
//!
//! HTTP server for the threaded chat backend: REST handlers under `/api/v1`,
//! the live thread feed at `/ws/threads/{thread_id}`, middleware, and the
//! [`chat`] module that implements connection tracking and broadcast.

pub mod chat;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{create_router, init_tracing, start_server, AppState, ServerConfig};
