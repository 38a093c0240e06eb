use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presence::UserId;
use crate::room::RoomId;

/// Durable record of one continuous presence interval in a room.
///
/// Opened on join, closed exactly once on leave. `close()` is idempotent so
/// overlapping exit signals cannot double-book the interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub focus_secs: u64,
    pub completed: bool,
}

impl StudySession {
    pub fn open(room_id: impl Into<RoomId>, user_id: impl Into<UserId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.into(),
            user_id: user_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            focus_secs: 0,
            completed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Close the session and return the focus delta in seconds.
    ///
    /// Repeat closes return 0 and change nothing. The end timestamp is
    /// clamped so it never precedes the start.
    pub fn close(&mut self, at: DateTime<Utc>) -> u64 {
        if !self.is_open() {
            return 0;
        }
        let end = at.max(self.started_at);
        self.ended_at = Some(end);
        self.focus_secs = (end - self.started_at).num_seconds().max(0) as u64;
        self.completed = true;
        self.focus_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn close_is_idempotent() {
        let mut session = StudySession::open("room-1", "user-1");
        session.started_at = Utc::now() - Duration::seconds(90);

        let delta = session.close(Utc::now());
        assert!(delta >= 90);
        assert!(session.completed);

        let again = session.close(Utc::now() + Duration::seconds(500));
        assert_eq!(again, 0);
        assert_eq!(session.focus_secs, delta);
    }

    #[test]
    fn end_never_precedes_start() {
        let mut session = StudySession::open("room-1", "user-1");
        let skewed = session.started_at - Duration::seconds(30);
        let delta = session.close(skewed);
        assert_eq!(delta, 0);
        assert_eq!(session.ended_at, Some(session.started_at));
    }
}
