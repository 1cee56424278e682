//! # Connection Registry
//!
//! Tracks, per thread, the live chat connections and fans envelopes out to them.
//!
//! A connection is represented by the sending half of its bounded outbound
//! channel; a dedicated writer task owns the socket and drains that channel.
//! Pushes use `try_send`, so the registry lock is only held for map operations
//! and channel pushes, never across an `.await`. A connection whose queue is
//! full (the peer stopped reading) is treated like a closed one and removed.

use super::envelope::Envelope;
use axum::extract::ws::Message as WsMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Identity of one live socket.
pub type ConnectionId = Uuid;

/// Frames that may wait for one socket's writer before the connection is dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Outbound queue of one socket.
pub type ConnectionSender = mpsc::Sender<WsMessage>;

/// Receiving half drained by the socket writer.
pub type ConnectionReceiver = mpsc::Receiver<WsMessage>;

/// Bounded outbound queue for a new connection.
pub fn outbound_channel() -> (ConnectionSender, ConnectionReceiver) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

type ThreadConnections = HashMap<ConnectionId, ConnectionSender>;

/// Shared per-thread connection sets.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    threads: Arc<RwLock<HashMap<i64, ThreadConnections>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a thread's set, creating the set if needed.
    pub fn register(&self, thread_id: i64, connection_id: ConnectionId, sender: ConnectionSender) {
        let mut threads = self.threads.write();
        let connections = threads.entry(thread_id).or_default();
        if connections.insert(connection_id, sender).is_some() {
            warn!(thread_id, connection_id = %connection_id, "Connection registered twice; replacing previous entry");
        }
        debug!(thread_id, connection_id = %connection_id, connections = connections.len(), "Connection registered");
    }

    /// Register and return a guard that unregisters on drop.
    pub fn register_guarded(&self, thread_id: i64, connection_id: ConnectionId, sender: ConnectionSender) -> Registration {
        self.register(thread_id, connection_id, sender);
        Registration {
            registry: self.clone(),
            thread_id,
            connection_id,
        }
    }

    /// Remove a connection. Empty thread sets are dropped.
    ///
    /// Returns whether an entry was removed; absent entries are a no-op.
    pub fn unregister(&self, thread_id: i64, connection_id: ConnectionId) -> bool {
        let mut threads = self.threads.write();
        let Some(connections) = threads.get_mut(&thread_id) else {
            return false;
        };
        let removed = connections.remove(&connection_id).is_some();
        let remaining = connections.len();
        if remaining == 0 {
            threads.remove(&thread_id);
        }
        if removed {
            debug!(thread_id, connection_id = %connection_id, remaining, "Connection unregistered");
        }
        removed
    }

    /// Deliver an envelope to every connection of a thread.
    ///
    /// Best-effort: connections whose queue is closed or full are unregistered
    /// and the rest still receive the envelope. Returns the number of deliveries.
    pub fn broadcast(&self, thread_id: i64, envelope: &Envelope) -> usize {
        let frame = match envelope.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(thread_id, error = %e, kind = envelope.kind(), "Failed to serialize broadcast envelope");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let threads = self.threads.read();
            let Some(connections) = threads.get(&thread_id) else {
                return 0;
            };
            for (connection_id, sender) in connections {
                match sender.try_send(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => dead.push((*connection_id, "queue full")),
                    Err(TrySendError::Closed(_)) => dead.push((*connection_id, "queue closed")),
                }
            }
        }

        for (connection_id, reason) in dead {
            warn!(thread_id, connection_id = %connection_id, reason, "Dropping connection after failed send");
            self.unregister(thread_id, connection_id);
        }

        debug!(thread_id, kind = envelope.kind(), delivered, "Broadcast complete");
        delivered
    }

    /// Number of live connections on a thread.
    pub fn connection_count(&self, thread_id: i64) -> usize {
        self.threads.read().get(&thread_id).map_or(0, HashMap::len)
    }

    /// Number of threads with at least one live connection.
    pub fn thread_count(&self) -> usize {
        self.threads.read().len()
    }

    /// Total live connections across all threads.
    pub fn total_connections(&self) -> usize {
        self.threads.read().values().map(HashMap::len).sum()
    }
}

/// Registry entry that removes itself when dropped.
pub struct Registration {
    registry: ConnectionRegistry,
    thread_id: i64,
    connection_id: ConnectionId,
}

impl Registration {
    pub fn thread_id(&self) -> i64 {
        self.thread_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.thread_id, self.connection_id);
    }
}

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> (ConnectionId, ConnectionSender, ConnectionReceiver) {
        let (tx, rx) = outbound_channel();
        (Uuid::new_v4(), tx, rx)
    }

    fn drain(rx: &mut ConnectionReceiver) -> usize {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    #[test]
    fn test_register_and_unregister_cleans_empty_threads() {
        let registry = ConnectionRegistry::new();
        let (a, tx_a, _rx_a) = connection();
        let (b, tx_b, _rx_b) = connection();

        registry.register(1, a, tx_a);
        registry.register(1, b, tx_b);
        assert_eq!(registry.connection_count(1), 2);

        assert!(registry.unregister(1, a));
        assert_eq!(registry.connection_count(1), 1);
        assert!(registry.unregister(1, b));
        assert_eq!(registry.thread_count(), 0);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.unregister(42, Uuid::new_v4()));

        let (a, tx_a, _rx_a) = connection();
        registry.register(1, a, tx_a);
        assert!(!registry.unregister(1, Uuid::new_v4()));
        assert!(registry.unregister(1, a));
        assert!(!registry.unregister(1, a));
    }

    #[test]
    fn test_broadcast_reaches_only_thread_members() {
        let registry = ConnectionRegistry::new();
        let (a, tx_a, mut rx_a) = connection();
        let (b, tx_b, mut rx_b) = connection();
        let (c, tx_c, mut rx_c) = connection();
        registry.register(1, a, tx_a);
        registry.register(1, b, tx_b);
        registry.register(2, c, tx_c);

        let delivered = registry.broadcast(1, &Envelope::pong());

        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut rx_a), 1);
        assert_eq!(drain(&mut rx_b), 1);
        assert_eq!(drain(&mut rx_c), 0);
    }

    #[test]
    fn test_broadcast_to_empty_thread_is_silent() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.broadcast(99, &Envelope::pong()), 0);
        assert_eq!(registry.thread_count(), 0);
    }

    #[test]
    fn test_failed_send_is_isolated_and_removed() {
        let registry = ConnectionRegistry::new();
        let (a, tx_a, mut rx_a) = connection();
        let (b, tx_b, rx_b) = connection();
        let (c, tx_c, mut rx_c) = connection();
        registry.register(1, a, tx_a);
        registry.register(1, b, tx_b);
        registry.register(1, c, tx_c);

        drop(rx_b);
        let delivered = registry.broadcast(1, &Envelope::pong());

        assert_eq!(delivered, 2);
        assert_eq!(registry.connection_count(1), 2);
        assert_eq!(drain(&mut rx_a), 1);
        assert_eq!(drain(&mut rx_c), 1);

        assert_eq!(registry.broadcast(1, &Envelope::pong()), 2);
    }

    #[test]
    fn test_stalled_connection_is_removed_once_its_queue_fills() {
        let registry = ConnectionRegistry::new();
        let (live, tx_live, mut rx_live) = connection();
        let (stalled, tx_stalled, mut rx_stalled) = connection();
        registry.register(1, live, tx_live);
        registry.register(1, stalled, tx_stalled);

        // The stalled receiver is never drained
        for _ in 0..OUTBOUND_QUEUE_CAPACITY {
            assert_eq!(registry.broadcast(1, &Envelope::pong()), 2);
            drain(&mut rx_live);
        }
        assert_eq!(registry.connection_count(1), 2);

        assert_eq!(registry.broadcast(1, &Envelope::pong()), 1);
        assert_eq!(registry.connection_count(1), 1);
        assert_eq!(drain(&mut rx_live), 1);

        // Nothing further is queued for the removed connection
        for _ in 0..1_000 {
            registry.broadcast(1, &Envelope::pong());
        }
        assert_eq!(drain(&mut rx_stalled), OUTBOUND_QUEUE_CAPACITY);
    }

    #[test]
    fn test_registration_guard_unregisters_once() {
        let registry = ConnectionRegistry::new();
        let (a, tx_a, _rx_a) = connection();

        let guard = registry.register_guarded(7, a, tx_a);
        assert_eq!(guard.thread_id(), 7);
        assert_eq!(registry.connection_count(7), 1);

        // Explicit removal before the guard drops must not fail the guard
        registry.unregister(7, a);
        drop(guard);
        assert_eq!(registry.total_connections(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_registration_across_tasks() {
        let registry = ConnectionRegistry::new();
        let mut handles = Vec::new();

        for i in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (id, tx, _rx) = connection();
                let thread_id = i % 4;
                registry.register(thread_id, id, tx);
                registry.broadcast(thread_id, &Envelope::pong());
                registry.unregister(thread_id, id);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.total_connections(), 0);
        assert_eq!(registry.thread_count(), 0);
    }
}
// endregion: --- Tests
