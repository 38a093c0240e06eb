//! In-process room backend.
//!
//! Implements the same contract a hosted deployment would: capacity
//! enforcement, retry-safe joins, idempotent leaves that credit focus time,
//! heartbeat liveness, and the two janitor sweeps (stale participants,
//! abandoned empty rooms). State is serializable so the CLI can keep it
//! across invocations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::RoomBackend;
use crate::accounting::{self, ProgressTotals};
use crate::achievements;
use crate::error::{BackendError, CoreError, JoinError, ValidationError};
use crate::presence::UserId;
use crate::room::{Room, RoomId, RoomTimerUpdate};
use crate::session::StudySession;
use crate::timer::TimerSettings;

/// Largest accepted room capacity.
pub const MAX_ROOM_CAPACITY: u32 = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticipantEntry {
    user_id: UserId,
    joined_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoomEntry {
    room: Room,
    participants: HashMap<UserId, ParticipantEntry>,
    sessions: Vec<StudySession>,
}

/// Serializable backend state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalState {
    rooms: HashMap<RoomId, RoomEntry>,
    profiles: HashMap<UserId, ProgressTotals>,
    unlocked: HashMap<UserId, Vec<String>>,
}

#[derive(Debug, Default)]
pub struct LocalBackend {
    state: Mutex<LocalState>,
    leave_calls: AtomicU64,
    beacons_sent: AtomicU64,
    heartbeats: AtomicU64,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(state: LocalState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Room administration ──────────────────────────────────────────

    pub fn create_room(
        &self,
        name: impl Into<String>,
        subject: impl Into<String>,
        capacity: u32,
        creator_id: &str,
        settings: &TimerSettings,
    ) -> Result<Room, CoreError> {
        if capacity == 0 || capacity > MAX_ROOM_CAPACITY {
            return Err(ValidationError::InvalidValue {
                field: "capacity".into(),
                message: format!("must be between 1 and {MAX_ROOM_CAPACITY}, got {capacity}"),
            }
            .into());
        }
        let room = Room::new(name, subject, capacity, settings);
        let mut state = self.lock_state();
        state.rooms.insert(
            room.id.clone(),
            RoomEntry {
                room: room.clone(),
                participants: HashMap::new(),
                sessions: Vec::new(),
            },
        );
        state
            .profiles
            .entry(creator_id.to_string())
            .or_default()
            .rooms_created += 1;
        Ok(room)
    }

    pub fn room(&self, room_id: &str) -> Option<Room> {
        self.lock_state().rooms.get(room_id).map(|e| e.room.clone())
    }

    /// All rooms, newest first.
    pub fn rooms(&self) -> Vec<Room> {
        let state = self.lock_state();
        let mut rooms: Vec<Room> = state.rooms.values().map(|e| e.room.clone()).collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rooms
    }

    pub fn profile(&self, user_id: &str) -> ProgressTotals {
        self.lock_state()
            .profiles
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn unlocked_achievements(&self, user_id: &str) -> Vec<String> {
        self.lock_state()
            .unlocked
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    // ── Janitor sweeps ───────────────────────────────────────────────

    /// Remove participants whose heartbeat went quiet, closing their
    /// sessions as a normal leave would. This is the defense against
    /// "ghost" participants that never fired an exit signal.
    pub fn reap_stale(&self, max_age: Duration, now: DateTime<Utc>) -> Vec<(RoomId, UserId)> {
        let mut state = self.lock_state();
        let stale: Vec<(RoomId, UserId)> = state
            .rooms
            .iter()
            .flat_map(|(room_id, entry)| {
                entry
                    .participants
                    .values()
                    .filter(|p| now - p.last_seen_at > max_age)
                    .map(|p| (room_id.clone(), p.user_id.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (room_id, user_id) in &stale {
            do_leave(&mut state, room_id, user_id, now);
        }
        stale
    }

    /// Delete rooms that have no participants and were created before the
    /// grace window.
    pub fn sweep_empty_rooms(&self, min_age: Duration, now: DateTime<Utc>) -> Vec<RoomId> {
        let mut state = self.lock_state();
        let doomed: Vec<RoomId> = state
            .rooms
            .iter()
            .filter(|(_, entry)| entry.participants.is_empty() && now - entry.room.created_at > min_age)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &doomed {
            state.rooms.remove(id);
        }
        doomed
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> LocalState {
        self.lock_state().clone()
    }

    pub fn persist(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&*self.lock_state())?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let state: LocalState = serde_json::from_str(&content)?;
        Ok(Self::restore(state))
    }

    // ── Test/simulation observability ────────────────────────────────

    pub fn open_session_count(&self, room_id: &str, user_id: &str) -> usize {
        self.lock_state()
            .rooms
            .get(room_id)
            .map(|e| {
                e.sessions
                    .iter()
                    .filter(|s| s.user_id == user_id && s.is_open())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Shift an open session's start back in time, standing in for wall
    /// clock that tests and CLI simulations cannot spend.
    pub fn backdate_open_session(&self, room_id: &str, user_id: &str, by_secs: i64) -> bool {
        let mut state = self.lock_state();
        let Some(entry) = state.rooms.get_mut(room_id) else {
            return false;
        };
        match entry
            .sessions
            .iter_mut()
            .rev()
            .find(|s| s.user_id == user_id && s.is_open())
        {
            Some(session) => {
                session.started_at -= Duration::seconds(by_secs);
                true
            }
            None => false,
        }
    }

    pub fn leave_call_count(&self) -> u64 {
        self.leave_calls.load(Ordering::SeqCst)
    }

    pub fn beacon_count(&self) -> u64 {
        self.beacons_sent.load(Ordering::SeqCst)
    }

    pub fn heartbeat_count(&self) -> u64 {
        self.heartbeats.load(Ordering::SeqCst)
    }
}

/// Close a participation: remove the participant entry, close the open
/// session, credit the profile and room aggregates. Idempotent.
fn do_leave(state: &mut LocalState, room_id: &str, user_id: &str, now: DateTime<Utc>) -> u64 {
    let delta = {
        let Some(entry) = state.rooms.get_mut(room_id) else {
            return 0;
        };
        if entry.participants.remove(user_id).is_some() {
            entry.room.participant_count = entry.participants.len() as u32;
        }
        entry
            .sessions
            .iter_mut()
            .rev()
            .find(|s| s.user_id == user_id && s.is_open())
            .map(|s| s.close(now))
            .unwrap_or(0)
    };
    if delta > 0 {
        let prior = state.profiles.get(user_id).cloned().unwrap_or_default();
        if let Some(next) = accounting::credit(delta, &prior, now.date_naive()) {
            state.profiles.insert(user_id.to_string(), next);
            if let Some(entry) = state.rooms.get_mut(room_id) {
                entry.room.credit_study_time(delta);
            }
        }
    }
    delta
}

#[async_trait]
impl RoomBackend for LocalBackend {
    async fn join_room(&self, room_id: &str, user_id: &str) -> Result<(), JoinError> {
        let now = Utc::now();
        let mut state = self.lock_state();
        {
            let entry = state
                .rooms
                .get_mut(room_id)
                .ok_or_else(|| JoinError::RoomNotFound(room_id.to_string()))?;
            // A retry of a join that already landed refreshes liveness and
            // opens no second session.
            if let Some(participant) = entry.participants.get_mut(user_id) {
                participant.last_seen_at = now;
                return Ok(());
            }
            if entry.participants.len() as u32 >= entry.room.capacity {
                return Err(JoinError::RoomFull {
                    room_id: room_id.to_string(),
                    capacity: entry.room.capacity,
                });
            }
            entry.participants.insert(
                user_id.to_string(),
                ParticipantEntry {
                    user_id: user_id.to_string(),
                    joined_at: now,
                    last_seen_at: now,
                },
            );
            entry.room.participant_count = entry.participants.len() as u32;
            entry.sessions.push(StudySession::open(room_id, user_id));
        }
        state
            .profiles
            .entry(user_id.to_string())
            .or_default()
            .rooms_joined += 1;
        Ok(())
    }

    async fn leave_room(&self, room_id: &str, user_id: &str) -> Result<u64, BackendError> {
        self.leave_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        Ok(do_leave(&mut state, room_id, user_id, Utc::now()))
    }

    async fn heartbeat(
        &self,
        room_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        if let Some(entry) = state.rooms.get_mut(room_id) {
            if let Some(participant) = entry.participants.get_mut(user_id) {
                participant.last_seen_at = at;
            }
        }
        Ok(())
    }

    async fn send_beacon(&self, room_id: &str, user_id: &str) -> Result<(), BackendError> {
        self.beacons_sent.fetch_add(1, Ordering::SeqCst);
        // The beacon endpoint performs the same idempotent leave.
        let mut state = self.lock_state();
        do_leave(&mut state, room_id, user_id, Utc::now());
        Ok(())
    }

    async fn update_room_timer(
        &self,
        room_id: &str,
        update: RoomTimerUpdate,
    ) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        if let Some(entry) = state.rooms.get_mut(room_id) {
            entry.room.apply_timer_update(&update);
        }
        Ok(())
    }

    async fn evaluate_achievements(&self, user_id: &str) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        let totals = state.profiles.get(user_id).cloned().unwrap_or_default();
        let ids: Vec<String> = achievements::unlocked(&totals)
            .into_iter()
            .map(|a| a.id.to_string())
            .collect();
        state.unlocked.insert(user_id.to_string(), ids);
        Ok(())
    }
}
