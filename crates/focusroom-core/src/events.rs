use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::presence::PresenceStatus;
use crate::timer::{SessionType, TimerState};

/// Every state change in the system produces an Event.
/// The UI polls for events; room subscriptions and tests observe them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero. The flip to `next_type` happened within the
    /// same tick; the engine is already running the next session.
    SessionCompleted {
        session_type: SessionType,
        next_type: SessionType,
        next_duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Advisory: a peer appeared on the presence channel.
    ParticipantJoined {
        user_id: String,
        at: DateTime<Utc>,
    },
    /// Advisory: a peer left the presence channel.
    ParticipantLeft {
        user_id: String,
        at: DateTime<Utc>,
    },
    /// A full-sync replaced the roster.
    PresenceSynced {
        participant_count: usize,
        at: DateTime<Utc>,
    },
    /// A peer re-published its record with a different status.
    StatusChanged {
        user_id: String,
        status: PresenceStatus,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        session_type: SessionType,
        remaining_secs: u64,
        total_secs: u64,
        at: DateTime<Utc>,
    },
}
