//! In-memory store and generators for exercising the chat layer without SQLite.

use super::registry::ConnectionReceiver;
use super::responder::ResponseGenerator;
use async_trait::async_trait;
use axum::extract::ws::Message as WsMessage;
use chrono::Utc;
use lib_core::model::store::{Message, MessageStore, Role, StoreSession, Thread};
use lib_core::{AppError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Default)]
struct Inner {
    threads: Mutex<Vec<i64>>,
    messages: Mutex<Vec<Message>>,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
    fail_writes: AtomicBool,
    unavailable: AtomicBool,
    opened: AtomicUsize,
    released: AtomicUsize,
    reads: AtomicUsize,
}

/// Shared in-memory message store.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<Inner>,
}

impl MockStore {
    pub fn with_thread(thread_id: i64) -> Self {
        let store = Self::default();
        store.inner.threads.lock().push(thread_id);
        store
    }

    /// Block every write until a permit is added to the returned semaphore.
    pub fn gate_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.inner.write_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every operation, including `open_session`, report the store as unusable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn messages(&self, thread_id: i64) -> Vec<Message> {
        self.inner
            .messages
            .lock()
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect()
    }

    pub fn message_count(&self, thread_id: i64) -> usize {
        self.messages(thread_id).len()
    }

    /// Sessions currently held (opened minus released).
    pub fn open_sessions(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst) - self.inner.released.load(Ordering::SeqCst)
    }

    /// Number of store calls made through sessions.
    pub fn reads(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("mock store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MockStore {
    async fn open_session(&self) -> Result<Box<dyn StoreSession>> {
        self.check_available()?;
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession { store: self.clone() }))
    }
}

struct MockSession {
    store: MockStore,
}

#[async_trait]
impl StoreSession for MockSession {
    async fn get_thread(&mut self, thread_id: i64) -> Result<Option<Thread>> {
        self.store.check_available()?;
        self.store.inner.reads.fetch_add(1, Ordering::SeqCst);
        let exists = self.store.inner.threads.lock().contains(&thread_id);
        Ok(exists.then(|| Thread {
            id: thread_id,
            title: "Mock thread".to_string(),
            user_id: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }))
    }

    async fn get_thread_messages(&mut self, thread_id: i64) -> Result<Vec<Message>> {
        self.store.check_available()?;
        self.store.inner.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.messages(thread_id))
    }

    async fn create_message(&mut self, content: &str, role: Role, thread_id: i64) -> Result<Message> {
        let gate = self.store.inner.write_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.store.check_available()?;
        self.store.inner.reads.fetch_add(1, Ordering::SeqCst);
        if self.store.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("mock write failure".to_string()));
        }

        let mut messages = self.store.inner.messages.lock();
        let message = Message {
            id: messages.len() as i64 + 1,
            thread_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        messages.push(message.clone());
        Ok(message)
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.store.inner.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Generator that always fails.
pub struct FailingGenerator;

#[async_trait]
impl ResponseGenerator for FailingGenerator {
    async fn generate(&self, _content: &str, _history: &[Message]) -> Result<String> {
        Err(AppError::Generation("model offline".to_string()))
    }
}

/// Generator that echoes the content and records the history length it saw.
#[derive(Default)]
pub struct EchoGenerator {
    pub history_lens: Mutex<Vec<usize>>,
}

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    async fn generate(&self, content: &str, history: &[Message]) -> Result<String> {
        self.history_lens.lock().push(history.len());
        Ok(format!("echo: {}", content))
    }
}

/// Drain queued text frames as JSON values.
pub fn frames(rx: &mut ConnectionReceiver) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let WsMessage::Text(text) = frame {
            out.push(serde_json::from_str(text.as_str()).expect("frame is JSON"));
        }
    }
    out
}
