//! Presence channel abstraction.
//!
//! Mirrors the hosted realtime presence primitive: "track my state", full
//! syncs, and advisory join/leave events, keyed by user id. The in-process
//! implementation broadcasts a full sync after every change, so a subscriber
//! that misses any advisory event still converges on the next sync.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::BackendError;
use crate::presence::{PresenceEvent, PresenceRecord, UserId};

/// Per-room publish/observe presence primitive.
#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Publish (or re-publish) the caller's presence record.
    async fn track(&self, record: PresenceRecord) -> Result<(), BackendError>;

    /// Stop publishing under this key.
    async fn untrack(&self, user_id: &str) -> Result<(), BackendError>;

    /// Observe the channel. A full sync is broadcast right after
    /// subscription so the new observer starts from an authoritative view.
    fn subscribe(&self) -> broadcast::Receiver<PresenceEvent>;
}

/// In-process presence channel used by tests and the CLI.
pub struct LocalPresenceChannel {
    state: Mutex<HashMap<UserId, PresenceRecord>>,
    tx: broadcast::Sender<PresenceEvent>,
}

impl LocalPresenceChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(HashMap::new()),
            tx,
        }
    }

    fn publish(&self, event: PresenceEvent) {
        // No receivers is fine; presence is observe-if-interested.
        let _ = self.tx.send(event);
    }

    fn sync_snapshot(&self, state: &HashMap<UserId, PresenceRecord>) -> PresenceEvent {
        PresenceEvent::Sync {
            records: state.values().cloned().collect(),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, PresenceRecord>> {
        // A poisoned roster is still a roster; recover and keep serving.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for LocalPresenceChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceChannel for LocalPresenceChannel {
    async fn track(&self, record: PresenceRecord) -> Result<(), BackendError> {
        let sync = {
            let mut state = self.lock_state();
            state.insert(record.user_id.clone(), record.clone());
            self.sync_snapshot(&state)
        };
        self.publish(PresenceEvent::Join { record });
        self.publish(sync);
        Ok(())
    }

    async fn untrack(&self, user_id: &str) -> Result<(), BackendError> {
        let sync = {
            let mut state = self.lock_state();
            if state.remove(user_id).is_none() {
                return Ok(());
            }
            self.sync_snapshot(&state)
        };
        self.publish(PresenceEvent::Leave {
            user_id: user_id.to_string(),
        });
        self.publish(sync);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        let rx = self.tx.subscribe();
        let sync = {
            let state = self.lock_state();
            self.sync_snapshot(&state)
        };
        self.publish(sync);
        rx
    }
}
