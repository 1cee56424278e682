//! # WebSocket Handlers
//!
//! ## Endpoints
//!
//! - `GET /ws/threads/{thread_id}` - Live feed of one thread
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8000/ws/threads/1');
//! ws.onmessage = (event) => {
//!   const envelope = JSON.parse(event.data);
//!   if (envelope.type === 'message') render(envelope.data);
//! };
//! ws.send(JSON.stringify({ content: 'Hello' }));
//! ```
//!
//! Each connection gets a writer task that owns the socket sink and drains the
//! connection's outbound queue; the [`ChatSession`] reads the stream half.

use crate::chat::{outbound_channel, ChatAppState, ChatSession, ConnectionReceiver, SessionEnd};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Time allowed for queued frames (including the close frame) to flush after the session ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn thread_websocket(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Path(thread_id): Path<i64>,
    State(chat): State<Arc<ChatAppState>>,
) -> Response {
    let connection_id = Uuid::new_v4();
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let client_ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    info!(
        connection_id = %connection_id,
        thread_id,
        client_ip = ?client_ip,
        user_agent = ?user_agent,
        "[WS] CONNECT_ATTEMPT connection_id={} thread_id={} ip={:?}",
        connection_id,
        thread_id,
        client_ip
    );

    ws.on_failed_upgrade(move |e| {
        warn!(
            connection_id = %connection_id,
            thread_id,
            error = %e,
            "[WS] UPGRADE_FAILED connection_id={} error={}",
            connection_id,
            e
        );
    })
    .on_upgrade(move |socket| async move {
        // Spawn handler task with panic handling
        let handle = tokio::spawn(handle_thread_socket(socket, chat, thread_id, connection_id));

        match handle.await {
            Ok(end) => {
                debug!(connection_id = %connection_id, end = ?end, "[WS] HANDLER_COMPLETE connection_id={}", connection_id);
            }
            Err(e) => {
                error!(
                    connection_id = %connection_id,
                    thread_id,
                    error = ?e,
                    "[WS] HANDLER_PANIC connection_id={} error={:?} - chat session panicked",
                    connection_id,
                    e
                );
            }
        }
    })
}

async fn handle_thread_socket(
    socket: WebSocket,
    chat: Arc<ChatAppState>,
    thread_id: i64,
    connection_id: Uuid,
) -> SessionEnd {
    let started = Instant::now();
    let (sink, stream) = socket.split();
    let (outbound, queue) = outbound_channel();

    let mut writer = tokio::spawn(write_frames(sink, queue, connection_id));

    info!(
        connection_id = %connection_id,
        thread_id,
        "[WS] CONNECTED connection_id={} thread_id={}",
        connection_id,
        thread_id
    );

    let end = ChatSession::new(chat.clone(), thread_id, connection_id, outbound)
        .run(stream)
        .await;

    // The session dropped its sender; the writer ends once the queue is drained
    let frames_sent = match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await {
        Ok(Ok(sent)) => sent,
        Ok(Err(e)) => {
            error!(connection_id = %connection_id, error = ?e, "[WS] WRITER_PANIC connection_id={}", connection_id);
            0
        }
        Err(_) => {
            warn!(connection_id = %connection_id, "[WS] WRITER_STALLED connection_id={} - aborting", connection_id);
            writer.abort();
            0
        }
    };

    let duration = started.elapsed();
    info!(
        connection_id = %connection_id,
        thread_id,
        end = ?end,
        duration_ms = duration.as_millis(),
        frames_sent,
        remaining_on_thread = chat.registry().connection_count(thread_id),
        "[WS] DISCONNECTED connection_id={} thread_id={} end={:?} duration={:.2}s frames_sent={}",
        connection_id,
        thread_id,
        end,
        duration.as_secs_f64(),
        frames_sent
    );

    end
}

/// Drain the outbound queue into the socket until the queue closes, a close
/// frame has been written, or the socket fails. Returns the number of frames written.
async fn write_frames(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut queue: ConnectionReceiver,
    connection_id: Uuid,
) -> u64 {
    let mut sent = 0u64;

    while let Some(frame) = queue.recv().await {
        let is_close = matches!(frame, WsMessage::Close(_));
        if let Err(e) = sink.send(frame).await {
            warn!(
                connection_id = %connection_id,
                error = %e,
                messages_sent = sent,
                "[WS] SEND_ERROR connection_id={} error={}",
                connection_id,
                e
            );
            return sent;
        }
        sent += 1;
        if is_close {
            return sent;
        }
    }

    // Queue closed without a close frame: finish the closing handshake
    if let Err(e) = sink.close().await {
        debug!(connection_id = %connection_id, error = %e, "[WS] Close after drain failed");
    }
    sent
}
