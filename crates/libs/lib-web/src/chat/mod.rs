//! # Chat Module
//!
//! Live thread conversations over WebSocket.
//!
//! - [`registry`] tracks the open connections of each thread and fans envelopes out
//! - [`session`] runs one connection's state machine
//! - [`coordinator`] stores messages before they are broadcast
//! - [`responder`] produces assistant replies
//! - [`envelope`] is the wire format

pub mod coordinator;
pub mod envelope;
pub mod registry;
pub mod responder;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{BroadcastCoordinator, ReplyError};
pub use envelope::Envelope;
pub use registry::{
    outbound_channel, ConnectionId, ConnectionReceiver, ConnectionRegistry, ConnectionSender, Registration,
    OUTBOUND_QUEUE_CAPACITY,
};
pub use responder::{ResponseGenerator, SimpleChatbot};
pub use session::{ChatSession, SessionEnd, SessionState};
pub use state::{ChatAppState, ChatSettings};
