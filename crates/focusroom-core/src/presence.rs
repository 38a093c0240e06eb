//! Per-room presence roster.
//!
//! The tracker mirrors a publish/observe channel: each participant publishes
//! its own record keyed by user id, and the roster is the latest record per
//! key. Full-sync events replace the whole view and are the only source of
//! truth; join/leave events are advisory and may be dropped without the
//! roster diverging, because the next sync rebuilds it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

pub type UserId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Focus,
    Break,
    Idle,
}

/// One participant's published presence record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub name: String,
    pub avatar: String,
    pub level: u32,
    pub status: PresenceStatus,
    pub reported_at: DateTime<Utc>,
}

impl PresenceRecord {
    pub fn new(
        user_id: impl Into<UserId>,
        name: impl Into<String>,
        avatar: impl Into<String>,
        level: u32,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            avatar: avatar.into(),
            level,
            status: PresenceStatus::Idle,
            reported_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: PresenceStatus) -> Self {
        self.status = status;
        self
    }
}

/// Events observed on a per-room presence channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresenceEvent {
    /// Authoritative snapshot; replaces the entire roster.
    Sync { records: Vec<PresenceRecord> },
    /// Advisory: a record was published under this key.
    Join { record: PresenceRecord },
    /// Advisory: the key stopped publishing.
    Leave { user_id: UserId },
}

/// Roster of the latest record per user key.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    roster: HashMap<UserId, PresenceRecord>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a channel event and report what changed, if anything.
    ///
    /// Conflicting publishes from the same user are not arbitrated: last
    /// write wins by arrival order.
    pub fn apply(&mut self, event: PresenceEvent) -> Option<Event> {
        match event {
            PresenceEvent::Sync { records } => {
                self.roster = records
                    .into_iter()
                    .map(|r| (r.user_id.clone(), r))
                    .collect();
                Some(Event::PresenceSynced {
                    participant_count: self.roster.len(),
                    at: Utc::now(),
                })
            }
            PresenceEvent::Join { record } => {
                let user_id = record.user_id.clone();
                let status = record.status;
                match self.roster.insert(user_id.clone(), record) {
                    None => Some(Event::ParticipantJoined {
                        user_id,
                        at: Utc::now(),
                    }),
                    Some(prev) if prev.status != status => Some(Event::StatusChanged {
                        user_id,
                        status,
                        at: Utc::now(),
                    }),
                    Some(_) => None,
                }
            }
            PresenceEvent::Leave { user_id } => {
                self.roster.remove(&user_id).map(|_| Event::ParticipantLeft {
                    user_id,
                    at: Utc::now(),
                })
            }
        }
    }

    /// Current participants in a stable display order.
    pub fn participants(&self) -> Vec<&PresenceRecord> {
        let mut list: Vec<&PresenceRecord> = self.roster.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.user_id.cmp(&b.user_id)));
        list
    }

    pub fn get(&self, user_id: &str) -> Option<&PresenceRecord> {
        self.roster.get(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.roster.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> PresenceRecord {
        PresenceRecord::new(id, name, format!("avatar-{id}"), 1)
    }

    #[test]
    fn join_then_leave() {
        let mut tracker = PresenceTracker::new();
        let event = tracker.apply(PresenceEvent::Join {
            record: record("u1", "Alice"),
        });
        assert!(matches!(event, Some(Event::ParticipantJoined { .. })));
        assert!(tracker.contains("u1"));

        let event = tracker.apply(PresenceEvent::Leave {
            user_id: "u1".into(),
        });
        assert!(matches!(event, Some(Event::ParticipantLeft { .. })));
        assert!(tracker.is_empty());
    }

    #[test]
    fn repeat_leave_is_silent() {
        let mut tracker = PresenceTracker::new();
        assert!(tracker
            .apply(PresenceEvent::Leave {
                user_id: "ghost".into()
            })
            .is_none());
    }

    #[test]
    fn republish_with_new_status_reports_change() {
        let mut tracker = PresenceTracker::new();
        tracker.apply(PresenceEvent::Join {
            record: record("u1", "Alice"),
        });
        let event = tracker.apply(PresenceEvent::Join {
            record: record("u1", "Alice").with_status(PresenceStatus::Focus),
        });
        assert!(matches!(
            event,
            Some(Event::StatusChanged {
                status: PresenceStatus::Focus,
                ..
            })
        ));
        assert_eq!(tracker.get("u1").unwrap().status, PresenceStatus::Focus);
    }

    #[test]
    fn sync_replaces_the_whole_roster() {
        let mut tracker = PresenceTracker::new();
        tracker.apply(PresenceEvent::Join {
            record: record("stale", "Stale"),
        });

        tracker.apply(PresenceEvent::Sync {
            records: vec![record("u1", "Alice"), record("u2", "Bob")],
        });
        assert_eq!(tracker.len(), 2);
        assert!(!tracker.contains("stale"));
    }

    #[test]
    fn roster_rebuilds_after_missed_increments() {
        // Tracker A sees every event, tracker B only the syncs; both must
        // end up with the same view.
        let mut a = PresenceTracker::new();
        let mut b = PresenceTracker::new();

        a.apply(PresenceEvent::Join {
            record: record("u1", "Alice"),
        });
        a.apply(PresenceEvent::Join {
            record: record("u2", "Bob"),
        });
        a.apply(PresenceEvent::Leave {
            user_id: "u1".into(),
        });

        b.apply(PresenceEvent::Sync {
            records: vec![record("u2", "Bob")],
        });

        let names =
            |t: &PresenceTracker| t.participants().iter().map(|r| r.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn participants_sorted_by_name() {
        let mut tracker = PresenceTracker::new();
        tracker.apply(PresenceEvent::Sync {
            records: vec![record("u2", "Zoe"), record("u1", "Alice")],
        });
        let names: Vec<_> = tracker.participants().iter().map(|r| r.name.as_str().to_string()).collect();
        assert_eq!(names, vec!["Alice", "Zoe"]);
    }
}
