//! Focus-time accounting.
//!
//! Converts a finalized elapsed-time measurement into durable totals:
//! focus seconds, completed-session count, experience, level, and streaks.
//! `credit` is a pure function of `(elapsed, prior)`; no other component
//! mutates totals, which keeps double-credit races impossible by
//! construction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sessions must be strictly longer than this to be credited.
pub const MIN_CREDITABLE_SECS: u64 = 60;
/// Experience gained per whole elapsed minute.
pub const XP_PER_MINUTE: u64 = 10;
/// Experience per level step.
pub const XP_PER_LEVEL: u64 = 1000;

/// Cumulative per-user progression totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressTotals {
    pub focus_secs: u64,
    pub sessions_completed: u64,
    pub experience: u64,
    pub level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub rooms_created: u64,
    pub rooms_joined: u64,
    /// Calendar day of the most recent credited session.
    pub last_session_on: Option<NaiveDate>,
}

impl Default for ProgressTotals {
    fn default() -> Self {
        Self {
            focus_secs: 0,
            sessions_completed: 0,
            experience: 0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            rooms_created: 0,
            rooms_joined: 0,
            last_session_on: None,
        }
    }
}

/// Level is a monotonic step function of cumulative experience.
pub fn level_for(experience: u64) -> u32 {
    (experience / XP_PER_LEVEL) as u32 + 1
}

/// Experience still needed to reach the next level.
pub fn experience_to_next_level(experience: u64) -> u64 {
    level_for(experience) as u64 * XP_PER_LEVEL - experience
}

/// Experience earned by an elapsed interval (whole minutes only).
pub fn experience_for(elapsed_secs: u64) -> u64 {
    (elapsed_secs / 60) * XP_PER_MINUTE
}

/// Credit an elapsed interval into new totals.
///
/// Returns `None` when the interval is at or below the minimum threshold;
/// such sessions are discarded, not errors. The boundary is strict: 61
/// seconds credits, 60 does not.
pub fn credit(
    elapsed_secs: u64,
    prior: &ProgressTotals,
    today: NaiveDate,
) -> Option<ProgressTotals> {
    if elapsed_secs <= MIN_CREDITABLE_SECS {
        return None;
    }

    let experience = prior.experience + experience_for(elapsed_secs);
    let current_streak = match prior.last_session_on {
        Some(day) if day == today => prior.current_streak.max(1),
        Some(day) if (today - day).num_days() == 1 => prior.current_streak + 1,
        _ => 1,
    };

    Some(ProgressTotals {
        focus_secs: prior.focus_secs + elapsed_secs,
        sessions_completed: prior.sessions_completed + 1,
        experience,
        level: level_for(experience),
        current_streak,
        longest_streak: prior.longest_streak.max(current_streak),
        rooms_created: prior.rooms_created,
        rooms_joined: prior.rooms_joined,
        last_session_on: Some(today),
    })
}
