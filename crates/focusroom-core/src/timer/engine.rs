//! Timer engine implementation.
//!
//! The timer engine is a caller-driven state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` once
//! per second while a session runs.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle          (explicit stop)
//!         Running -> Running       (expiry: flip session type in the same tick)
//! ```
//!
//! When a countdown reaches zero the engine flips the session type, preloads
//! the next configured duration and stays `Running`, all within the same
//! `tick()` call. A zero remaining value is never observable between ticks,
//! so a completion can only be reported once.
//!
//! Several clients may drive the same room's countdown concurrently. Each
//! client calls `sync_shared()` whenever the room subscription reports a
//! newer value, so every local tick decrements the freshest known state
//! instead of a stale local copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::{SessionType, TimerSettings};
use crate::accounting::MIN_CREDITABLE_SECS;
use crate::error::ValidationError;
use crate::events::Event;
use crate::room::RoomTimerUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
}

/// Wall-clock measurement of one start-to-stop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusMeasurement {
    pub session_type: SessionType,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_secs: u64,
}

/// Outcome of `stop()`.
///
/// `creditable` is `None` when the run lasted 60 seconds or less; such runs
/// are discarded before they ever reach accounting.
#[derive(Debug, Clone)]
pub struct StoppedRun {
    pub event: Event,
    pub creditable: Option<FocusMeasurement>,
}

/// Core timer engine.
///
/// Serializable so hosts can persist it between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    settings: TimerSettings,
    state: TimerState,
    session_type: SessionType,
    /// Remaining time in seconds for the current session.
    remaining_secs: u64,
    /// When the current run was started; used for the stop() measurement.
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

impl TimerEngine {
    /// Create a new engine in `Idle` with a study session preloaded.
    pub fn new(settings: TimerSettings) -> Self {
        let remaining_secs = settings.duration_secs(SessionType::Study);
        Self {
            settings,
            state: TimerState::Idle,
            session_type: SessionType::Study,
            remaining_secs,
            started_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn total_secs(&self) -> u64 {
        self.settings.duration_secs(self.session_type)
    }

    /// 0.0 .. 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / total as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            session_type: self.session_type,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            at: Utc::now(),
        }
    }

    /// The write-back payload for the shared room row.
    pub fn timer_update(&self) -> RoomTimerUpdate {
        RoomTimerUpdate {
            remaining_secs: self.remaining_secs,
            session_type: self.session_type,
            is_studying: self.state == TimerState::Running,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Idle => {
                self.state = TimerState::Running;
                self.started_at = Some(Utc::now());
                Some(Event::TimerStarted {
                    session_type: self.session_type,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            TimerState::Running => None, // Already running.
        }
    }

    /// Stop the countdown and finalize the wall-clock measurement.
    pub fn stop(&mut self) -> Option<StoppedRun> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::Idle;
        let ended_at = Utc::now();
        let creditable = self.started_at.take().and_then(|started_at| {
            let elapsed_secs = (ended_at - started_at).num_seconds().max(0) as u64;
            if elapsed_secs > MIN_CREDITABLE_SECS {
                Some(FocusMeasurement {
                    session_type: self.session_type,
                    started_at,
                    ended_at,
                    elapsed_secs,
                })
            } else {
                None // Accidental stop/start spam; discard.
            }
        });
        Some(StoppedRun {
            event: Event::TimerStopped {
                session_type: self.session_type,
                remaining_secs: self.remaining_secs,
                at: ended_at,
            },
            creditable,
        })
    }

    /// Reload the current session type's configured duration and go idle.
    pub fn reset(&mut self) -> Option<Event> {
        self.state = TimerState::Idle;
        self.started_at = None;
        self.remaining_secs = self.settings.duration_secs(self.session_type);
        Some(Event::TimerReset {
            session_type: self.session_type,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Rewrite the current session type's duration.
    ///
    /// Refuses out-of-range input before touching any state. An in-flight
    /// run is stopped first, so its measurement is finalized under the
    /// normal 60-second rule.
    pub fn set_custom_duration(
        &mut self,
        minutes: u64,
    ) -> Result<Option<StoppedRun>, ValidationError> {
        let mut settings = self.settings;
        settings.set_minutes(self.session_type, minutes)?;
        let stopped = self.stop();
        self.settings = settings;
        self.remaining_secs = self.settings.duration_secs(self.session_type);
        Ok(stopped)
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `Some(Event::SessionCompleted)` when the session expires;
    /// the flip to the next type has already happened by the time the event
    /// is visible.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            let finished = self.session_type;
            self.session_type = finished.other();
            self.remaining_secs = self.settings.duration_secs(self.session_type);
            return Some(Event::SessionCompleted {
                session_type: finished,
                next_type: self.session_type,
                next_duration_secs: self.remaining_secs,
                at: Utc::now(),
            });
        }
        None
    }

    /// Adopt the latest shared room countdown.
    ///
    /// The remaining value is capped at the longest configured duration so
    /// a misbehaving peer cannot push the counter out of bounds.
    pub fn sync_shared(&mut self, remaining_secs: u64, session_type: SessionType) {
        self.session_type = session_type;
        self.remaining_secs = remaining_secs.min(self.settings.max_duration_secs());
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}
