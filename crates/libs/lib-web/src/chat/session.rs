//! # Chat Session Handler
//!
//! Drives one chat connection through
//! `Connecting -> Verified -> Active -> Closing -> Closed`.
//!
//! The session reads frames from any stream of WebSocket messages and writes
//! through its outbound queue; the socket itself is owned by the caller's
//! writer task. Frames are processed strictly one after another: the next
//! frame is not read until the previous one has been stored, broadcast,
//! answered and the answer broadcast.
//!
//! The storage session is acquired before verification and held until the
//! connection ends. The registry entry is a drop guard, so every exit path
//! (including a panic) unregisters first and then releases storage.

use super::envelope::{
    close_frame, parse_client_frame, ClientFrame, Envelope, CLOSE_GOING_AWAY, CLOSE_INTERNAL,
    CLOSE_SERVER_ERROR, CLOSE_STORE_UNAVAILABLE, CLOSE_THREAD_NOT_FOUND,
};
use super::registry::{ConnectionId, ConnectionSender};
use super::state::ChatAppState;
use axum::extract::ws::Message as WsMessage;
use futures_util::{Stream, StreamExt};
use lib_core::model::store::{Role, StoreSession};
use lib_core::AppError;
use lib_utils::{validate_max_length, validate_not_empty};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Verified,
    Active,
    Closing,
    Closed,
}

/// One receive step, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(usize),
    /// Transport-level ping/pong, answered by the transport.
    Control,
    Closed(Option<u16>),
    Error(String),
}

impl Inbound {
    pub fn classify(frame: Option<Result<WsMessage, axum::Error>>) -> Self {
        match frame {
            None => Inbound::Closed(None),
            Some(Ok(WsMessage::Text(text))) => Inbound::Text(text.to_string()),
            Some(Ok(WsMessage::Binary(data))) => Inbound::Binary(data.len()),
            Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => Inbound::Control,
            Some(Ok(WsMessage::Close(frame))) => Inbound::Closed(frame.map(|f| f.code)),
            Some(Err(e)) => Inbound::Error(e.to_string()),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The thread did not exist at connect time.
    ThreadNotFound,
    /// The storage session could not be obtained or stopped working.
    StoreUnavailable,
    /// Unrecoverable internal failure.
    Internal,
    /// The client closed the connection.
    ClientClosed,
    /// Receiving from the transport failed.
    TransportError,
    /// The outbound queue is gone (writer task ended).
    OutboundClosed,
    /// The server is shutting down.
    Shutdown,
}

impl SessionEnd {
    /// Close code and reason sent to the client, if any.
    pub fn close_code(self) -> Option<(u16, &'static str)> {
        match self {
            SessionEnd::ThreadNotFound => Some((CLOSE_THREAD_NOT_FOUND, "Thread not found")),
            SessionEnd::StoreUnavailable => Some((CLOSE_STORE_UNAVAILABLE, "Storage unavailable")),
            SessionEnd::Internal => Some((CLOSE_INTERNAL, "Internal server error")),
            SessionEnd::TransportError => Some((CLOSE_SERVER_ERROR, "Connection error")),
            SessionEnd::Shutdown => Some((CLOSE_GOING_AWAY, "Server shutting down")),
            SessionEnd::ClientClosed | SessionEnd::OutboundClosed => None,
        }
    }
}

pub struct ChatSession {
    app: Arc<ChatAppState>,
    thread_id: i64,
    connection_id: ConnectionId,
    outbound: ConnectionSender,
    state: SessionState,
}

impl ChatSession {
    /// A session whose transport handshake has already been accepted.
    pub fn new(app: Arc<ChatAppState>, thread_id: i64, connection_id: ConnectionId, outbound: ConnectionSender) -> Self {
        Self {
            app,
            thread_id,
            connection_id,
            outbound,
            state: SessionState::Connecting,
        }
    }

    /// Run the session to completion.
    pub async fn run<S>(mut self, mut inbound: S) -> SessionEnd
    where
        S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin + Send,
    {
        self.transition(SessionState::Verified);

        let mut store = match self.app.store.open_session().await {
            Ok(store) => store,
            Err(e) => {
                error!(
                    thread_id = self.thread_id,
                    connection_id = %self.connection_id,
                    error = %e,
                    "[WS] STORE_ACQUIRE_FAILED thread_id={} error={}",
                    self.thread_id,
                    e
                );
                return self.finish(SessionEnd::StoreUnavailable, None);
            }
        };

        match store.get_thread(self.thread_id).await {
            Ok(Some(thread)) => {
                debug!(thread_id = thread.id, title = %thread.title, "[WS] Thread verified");
            }
            Ok(None) => {
                info!(
                    thread_id = self.thread_id,
                    connection_id = %self.connection_id,
                    "[WS] THREAD_NOT_FOUND thread_id={}",
                    self.thread_id
                );
                return self.finish(SessionEnd::ThreadNotFound, Some(store));
            }
            Err(e) => {
                error!(thread_id = self.thread_id, error = %e, "[WS] VERIFY_FAILED thread_id={} error={}", self.thread_id, e);
                let end = if e.is_store_unavailable() {
                    SessionEnd::StoreUnavailable
                } else {
                    SessionEnd::Internal
                };
                return self.finish(end, Some(store));
            }
        }

        let registration = self
            .app
            .registry()
            .register_guarded(self.thread_id, self.connection_id, self.outbound.clone());

        let end = if self.send(&Envelope::connected(self.thread_id)) {
            self.transition(SessionState::Active);
            self.receive_loop(&mut inbound, &mut *store).await
        } else {
            SessionEnd::OutboundClosed
        };

        self.transition(SessionState::Closing);
        drop(registration);
        self.finish(end, Some(store))
    }

    async fn receive_loop<S>(&self, inbound: &mut S, store: &mut dyn StoreSession) -> SessionEnd
    where
        S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin + Send,
    {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.app.shutdown.cancelled() => return SessionEnd::Shutdown,
                frame = inbound.next() => Inbound::classify(frame),
            };

            match frame {
                Inbound::Text(text) => {
                    if let Some(end) = self.handle_text(&text, store).await {
                        return end;
                    }
                }
                Inbound::Binary(size) => {
                    debug!(connection_id = %self.connection_id, size, "[WS] BINARY_RECEIVED size={}", size);
                    let envelope = Envelope::error_with_details("Unsupported frame", "binary frames are not accepted");
                    if !self.send(&envelope) {
                        return SessionEnd::OutboundClosed;
                    }
                }
                Inbound::Control => {}
                Inbound::Closed(code) => {
                    info!(
                        thread_id = self.thread_id,
                        connection_id = %self.connection_id,
                        code = ?code,
                        "[WS] CLOSE_RECEIVED code={:?}",
                        code
                    );
                    return SessionEnd::ClientClosed;
                }
                Inbound::Error(reason) => {
                    warn!(
                        thread_id = self.thread_id,
                        connection_id = %self.connection_id,
                        error = %reason,
                        "[WS] RECV_ERROR error={}",
                        reason
                    );
                    return SessionEnd::TransportError;
                }
            }
        }
    }

    /// Process one text frame. `Some` ends the session.
    async fn handle_text(&self, text: &str, store: &mut dyn StoreSession) -> Option<SessionEnd> {
        let content = match parse_client_frame(text) {
            Ok(ClientFrame::Ping) => return self.reply(Envelope::pong()),
            Ok(ClientFrame::Message(content)) => content,
            Err(e) => {
                debug!(connection_id = %self.connection_id, error = %e, "[WS] MALFORMED_FRAME");
                return self.reply(Envelope::error_with_details("Invalid message format", e.to_string()));
            }
        };

        if let Err(reason) = validate_not_empty(&content, "Message content")
            .and_then(|_| validate_max_length(&content, self.app.settings.max_message_length, "Message content"))
        {
            return self.reply(Envelope::error(reason));
        }

        let coordinator = &self.app.coordinator;

        if let Err(e) = coordinator.publish(store, self.thread_id, Role::User, &content).await {
            return self.report_failure("Failed to save message", &e);
        }

        match coordinator
            .reply(store, self.app.generator.as_ref(), self.thread_id, &content)
            .await
        {
            Ok(_) => None,
            Err(e) => self.report_failure(e.client_message(), e.source()),
        }
    }

    /// Tell the sender about a failed step, or end the session if storage is gone.
    fn report_failure(&self, message: &str, err: &AppError) -> Option<SessionEnd> {
        if err.is_store_unavailable() {
            error!(
                thread_id = self.thread_id,
                connection_id = %self.connection_id,
                error = %err,
                "[WS] STORE_LOST error={}",
                err
            );
            return Some(SessionEnd::StoreUnavailable);
        }

        warn!(
            thread_id = self.thread_id,
            connection_id = %self.connection_id,
            error = %err,
            "{}",
            message
        );
        self.reply(Envelope::error_with_details(message, err.user_message()))
    }

    /// Send to this connection only. `Some` when the queue is gone or full.
    fn reply(&self, envelope: Envelope) -> Option<SessionEnd> {
        if self.send(&envelope) {
            None
        } else {
            Some(SessionEnd::OutboundClosed)
        }
    }

    fn send(&self, envelope: &Envelope) -> bool {
        match envelope.to_frame() {
            Ok(frame) => self.outbound.try_send(frame).is_ok(),
            Err(e) => {
                error!(connection_id = %self.connection_id, error = %e, "Failed to serialize envelope");
                false
            }
        }
    }

    /// Release storage, emit the close sequence and enter `Closed`.
    fn finish(&mut self, end: SessionEnd, store: Option<Box<dyn StoreSession>>) -> SessionEnd {
        if self.state != SessionState::Closing {
            self.transition(SessionState::Closing);
        }
        drop(store);

        if let Some((code, reason)) = end.close_code() {
            if code != CLOSE_GOING_AWAY {
                self.send(&Envelope::closing(reason, code));
            }
            let _ = self.outbound.try_send(close_frame(code, reason));
        }

        self.transition(SessionState::Closed);
        end
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            thread_id = self.thread_id,
            connection_id = %self.connection_id,
            from = ?self.state,
            to = ?next,
            "[WS] STATE"
        );
        self.state = next;
    }
}

// endregion: --- Tests
