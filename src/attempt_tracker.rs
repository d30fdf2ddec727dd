use crate::models::{FailureKind, ReceivedMessage};
use log::info;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedState = Arc<Mutex<Vec<Arc<AttemptTracker>>>>;

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Idle,
    Connecting,
    Connected,
    Receiving,
    Failed { kind: FailureKind, detail: String },
}

/// Observable record of one connection attempt. The probe task writes it,
/// observers (the final summary, tests) only read.
pub struct AttemptTracker {
    pub port: u16,
    state: Mutex<AttemptState>,
    subscribe_count: AtomicU32,
    messages: Mutex<Vec<ReceivedMessage>>,
}

impl AttemptTracker {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            state: Mutex::new(AttemptState::Idle),
            subscribe_count: AtomicU32::new(0),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub async fn set_state(&self, state: AttemptState) {
        let mut current = self.state.lock().await;
        *current = state;
    }

    pub async fn state(&self) -> AttemptState {
        self.state.lock().await.clone()
    }

    pub async fn mark_failed(&self, kind: FailureKind, detail: String) {
        let mut current = self.state.lock().await;
        *current = AttemptState::Failed { kind, detail };
        info!("Attempt on port {} recorded as failed.", self.port);
    }

    pub fn record_subscribe(&self) {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    pub async fn record_message(&self, message: ReceivedMessage) {
        let mut messages = self.messages.lock().await;
        messages.push(message);
    }

    pub async fn messages(&self) -> Vec<ReceivedMessage> {
        self.messages.lock().await.clone()
    }
}

impl fmt::Debug for AttemptTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptTracker")
            .field("port", &self.port)
            .field("state", &"Mutex<AttemptState>")
            .field("subscribe_count", &self.subscribe_count.load(Ordering::SeqCst))
            .finish()
    }
}
