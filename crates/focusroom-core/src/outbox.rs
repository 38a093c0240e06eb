//! Pending-command outbox for provisional chat messages.
//!
//! A locally-authored message is a command with an explicit resolution:
//! it stays `Pending` until the server acknowledges it (`Confirmed`, with
//! the authoritative id) or refuses it (`Rejected`). The UI merges pending
//! entries after the confirmed history; resolved entries are drained once
//! the authoritative copy has arrived through the subscription.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presence::UserId;
use crate::room::RoomId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommandState {
    Pending,
    Confirmed { server_id: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMessage {
    pub local_id: String,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub body: String,
    pub queued_at: DateTime<Utc>,
    pub state: CommandState,
}

impl PendingMessage {
    pub fn is_pending(&self) -> bool {
        self.state == CommandState::Pending
    }
}

/// Ordered set of in-flight message commands.
#[derive(Debug, Default)]
pub struct ChatOutbox {
    entries: Vec<PendingMessage>,
}

impl ChatOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message and return its local id.
    pub fn enqueue(
        &mut self,
        room_id: impl Into<RoomId>,
        user_id: impl Into<UserId>,
        body: impl Into<String>,
    ) -> String {
        let local_id = Uuid::new_v4().to_string();
        self.entries.push(PendingMessage {
            local_id: local_id.clone(),
            room_id: room_id.into(),
            user_id: user_id.into(),
            body: body.into(),
            queued_at: Utc::now(),
            state: CommandState::Pending,
        });
        local_id
    }

    /// Resolve a command with the server's authoritative id.
    pub fn confirm(&mut self, local_id: &str, server_id: impl Into<String>) -> bool {
        self.resolve(local_id, CommandState::Confirmed {
            server_id: server_id.into(),
        })
    }

    /// Resolve a command as refused.
    pub fn reject(&mut self, local_id: &str, reason: impl Into<String>) -> bool {
        self.resolve(local_id, CommandState::Rejected {
            reason: reason.into(),
        })
    }

    fn resolve(&mut self, local_id: &str, state: CommandState) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|m| m.local_id == local_id && m.is_pending())
        {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    /// Entries the UI should still display provisionally, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingMessage> {
        self.entries.iter().filter(|m| m.is_pending())
    }

    /// Remove and return every resolved entry.
    pub fn drain_resolved(&mut self) -> Vec<PendingMessage> {
        let (resolved, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|m| !m.is_pending());
        self.entries = pending;
        resolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
