use serde::Serialize;
use tokio::sync::broadcast;

use super::{SessionSnapshot, SessionState};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DispatchEvent {
    StateChanged {
        state: SessionState,
        session_id: Option<String>,
    },
    Tick(Box<SessionSnapshot>),
    Arrived {
        session_id: String,
    },
}

/// Fan-out of controller events to any number of front-ends. Sending with no
/// subscribers is not an error.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: DispatchEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
