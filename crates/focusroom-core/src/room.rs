use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{SessionType, TimerSettings};

pub type RoomId = String;

/// A bounded group study room with shared timer state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub subject: String,
    /// Fixed participant capacity.
    pub capacity: u32,
    pub is_studying: bool,
    pub session_type: SessionType,
    /// Shared countdown, in seconds.
    pub remaining_secs: u64,
    /// Cumulative focus time credited to this room.
    pub total_study_secs: u64,
    pub participant_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        capacity: u32,
        settings: &TimerSettings,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            subject: subject.into(),
            capacity,
            is_studying: false,
            session_type: SessionType::Study,
            remaining_secs: settings.duration_secs(SessionType::Study),
            total_study_secs: 0,
            participant_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.participant_count < self.capacity
    }

    pub fn apply_timer_update(&mut self, update: &RoomTimerUpdate) {
        self.remaining_secs = update.remaining_secs;
        self.session_type = update.session_type;
        self.is_studying = update.is_studying;
    }

    pub fn credit_study_time(&mut self, secs: u64) {
        self.total_study_secs = self.total_study_secs.saturating_add(secs);
    }
}

/// Write-back payload for the shared timer columns of a room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomTimerUpdate {
    pub remaining_secs: u64,
    pub session_type: SessionType,
    pub is_studying: bool,
}
