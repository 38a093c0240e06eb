use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Study,
    Break,
}

impl SessionType {
    /// The session type the engine flips to when this one expires.
    pub fn other(self) -> Self {
        match self {
            SessionType::Study => SessionType::Break,
            SessionType::Break => SessionType::Study,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::Study => "study",
            SessionType::Break => "break",
        }
    }
}

/// Shortest accepted session duration.
pub const MIN_SESSION_MINUTES: u64 = 1;
/// Longest accepted session duration.
pub const MAX_SESSION_MINUTES: u64 = 180;

/// Per-type session durations, configured in whole minutes.
///
/// All internal arithmetic is in integer seconds (`minutes * 60`).
/// Out-of-range values are refused at this boundary, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    study_minutes: u64,
    break_minutes: u64,
}

impl TimerSettings {
    pub fn new(study_minutes: u64, break_minutes: u64) -> Result<Self, ValidationError> {
        check_minutes(study_minutes)?;
        check_minutes(break_minutes)?;
        Ok(Self {
            study_minutes,
            break_minutes,
        })
    }

    pub fn minutes(&self, session_type: SessionType) -> u64 {
        match session_type {
            SessionType::Study => self.study_minutes,
            SessionType::Break => self.break_minutes,
        }
    }

    /// Configured duration of a session type in seconds.
    pub fn duration_secs(&self, session_type: SessionType) -> u64 {
        self.minutes(session_type).saturating_mul(60)
    }

    /// Upper bound on any remaining-seconds value for these settings.
    pub fn max_duration_secs(&self) -> u64 {
        self.duration_secs(SessionType::Study)
            .max(self.duration_secs(SessionType::Break))
    }

    pub fn set_minutes(
        &mut self,
        session_type: SessionType,
        minutes: u64,
    ) -> Result<(), ValidationError> {
        check_minutes(minutes)?;
        match session_type {
            SessionType::Study => self.study_minutes = minutes,
            SessionType::Break => self.break_minutes = minutes,
        }
        Ok(())
    }
}

impl Default for TimerSettings {
    /// The classic 25/5 split.
    fn default() -> Self {
        Self {
            study_minutes: 25,
            break_minutes: 5,
        }
    }
}

fn check_minutes(minutes: u64) -> Result<(), ValidationError> {
    if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&minutes) {
        return Err(ValidationError::DurationOutOfRange {
            minutes,
            min: MIN_SESSION_MINUTES,
            max: MAX_SESSION_MINUTES,
        });
    }
    Ok(())
}
