//! # Envelope Codec
//!
//! Every frame the server writes to a chat socket is an [`Envelope`]:
//! a tagged JSON object `{"type": ..., "data": ...}`.
//!
//! ```json
//! {"type":"connected","data":{"thread_id":1,"message":"Connected to thread 1"}}
//! {"type":"message","data":{"id":5,"content":"hi","role":"user","created_at":"2024-05-01T12:00:00.000000Z","thread_id":1}}
//! {"type":"error","data":{"message":"Invalid message format","details":"expected value at line 1 column 1"}}
//! {"type":"pong","data":{}}
//! ```

use axum::extract::ws::{CloseFrame, Message as WsMessage};
use lib_core::dto::MessageResponse;
use lib_core::model::store::Message;
use serde::{Deserialize, Serialize};

/// Close code: the storage session cannot be used.
pub const CLOSE_STORE_UNAVAILABLE: u16 = 4003;
/// Close code: the requested thread does not exist.
pub const CLOSE_THREAD_NOT_FOUND: u16 = 4004;
/// Close code: unrecoverable internal error.
pub const CLOSE_INTERNAL: u16 = 4005;
/// Close code: generic server error fallback (RFC 6455 "internal error").
pub const CLOSE_SERVER_ERROR: u16 = 1011;
/// Close code: server is going away.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Outbound wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Envelope {
    Connected { thread_id: i64, message: String },
    Message(MessageResponse),
    Error(ErrorData),
    Ping {},
    Pong {},
}

/// Payload of an `error` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl Envelope {
    pub fn connected(thread_id: i64) -> Self {
        Envelope::Connected {
            thread_id,
            message: format!("Connected to thread {}", thread_id),
        }
    }

    pub fn message(message: &Message) -> Self {
        Envelope::Message(MessageResponse::from(message))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error(ErrorData {
            message: message.into(),
            details: None,
            code: None,
        })
    }

    pub fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Envelope::Error(ErrorData {
            message: message.into(),
            details: Some(details.into()),
            code: None,
        })
    }

    /// Error envelope announcing the close code that follows it.
    pub fn closing(message: impl Into<String>, code: u16) -> Self {
        Envelope::Error(ErrorData {
            message: message.into(),
            details: None,
            code: Some(code),
        })
    }

    pub fn pong() -> Self {
        Envelope::Pong {}
    }

    /// Short name of the envelope type, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Connected { .. } => "connected",
            Envelope::Message(_) => "message",
            Envelope::Error(_) => "error",
            Envelope::Ping {} => "ping",
            Envelope::Pong {} => "pong",
        }
    }

    /// Serialize into a WebSocket text frame.
    pub fn to_frame(&self) -> serde_json::Result<WsMessage> {
        let json = serde_json::to_string(self)?;
        Ok(WsMessage::Text(json.into()))
    }
}

/// Build a close frame.
pub fn close_frame(code: u16, reason: &str) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }))
}

/// Inbound chat payload: `{"content": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub content: String,
}

/// What a client asked for with one text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Ping,
    Message(String),
}

/// Decode an inbound text frame.
///
/// The literal `ping` (or a `{"type":"ping"}` envelope) is a keepalive.
/// Anything else must be a JSON object carrying `content`.
pub fn parse_client_frame(text: &str) -> serde_json::Result<ClientFrame> {
    if text.trim() == "ping" {
        return Ok(ClientFrame::Ping);
    }
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("type").and_then(|t| t.as_str()) == Some(Envelope::Ping {}.kind()) {
        return Ok(ClientFrame::Ping);
    }
    let inbound: InboundMessage = serde_json::from_value(value)?;
    Ok(ClientFrame::Message(inbound.content))
}

// endregion: --- Tests
