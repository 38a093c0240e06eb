//! Achievement catalog and unlock evaluation.
//!
//! Unlocks that derive from progression totals are evaluated here; the
//! time-of-day and social ones depend on server-side history and are only
//! listed so clients can render them.

use serde::Serialize;

use crate::accounting::ProgressTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Focus,
    Streak,
    Social,
    Special,
}

/// What a given achievement measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    SessionsCompleted(u64),
    FocusSeconds(u64),
    StreakDays(u32),
    RoomsCreated(u64),
    /// Granted by the backend; not derivable from totals.
    External,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    pub requirement: Requirement,
}

impl Achievement {
    pub fn is_unlocked(&self, totals: &ProgressTotals) -> bool {
        match self.requirement {
            Requirement::SessionsCompleted(n) => totals.sessions_completed >= n,
            Requirement::FocusSeconds(n) => totals.focus_secs >= n,
            Requirement::StreakDays(n) => totals.longest_streak >= n,
            Requirement::RoomsCreated(n) => totals.rooms_created >= n,
            Requirement::External => false,
        }
    }
}

static CATALOG: [Achievement; 8] = [
    Achievement {
        id: "first-session",
        name: "First Steps",
        description: "Complete your first study session",
        category: AchievementCategory::Focus,
        requirement: Requirement::SessionsCompleted(1),
    },
    Achievement {
        id: "marathon-studier",
        name: "Marathon Studier",
        description: "Study for 3 hours in one day",
        category: AchievementCategory::Focus,
        requirement: Requirement::FocusSeconds(10_800),
    },
    Achievement {
        id: "focus-master",
        name: "Focus Master",
        description: "Reach 100 hours of focus time",
        category: AchievementCategory::Focus,
        requirement: Requirement::FocusSeconds(360_000),
    },
    Achievement {
        id: "consistent-learner",
        name: "Consistent Learner",
        description: "Study 7 days in a row",
        category: AchievementCategory::Streak,
        requirement: Requirement::StreakDays(7),
    },
    Achievement {
        id: "room-creator",
        name: "Room Creator",
        description: "Create your first study room",
        category: AchievementCategory::Social,
        requirement: Requirement::RoomsCreated(1),
    },
    Achievement {
        id: "helpful-helper",
        name: "Helpful Helper",
        description: "Send 50 encouraging messages",
        category: AchievementCategory::Social,
        requirement: Requirement::External,
    },
    Achievement {
        id: "early-bird",
        name: "Early Bird",
        description: "Study before 7 AM",
        category: AchievementCategory::Special,
        requirement: Requirement::External,
    },
    Achievement {
        id: "night-owl",
        name: "Night Owl",
        description: "Study after 10 PM",
        category: AchievementCategory::Special,
        requirement: Requirement::External,
    },
];

pub fn catalog() -> &'static [Achievement] {
    &CATALOG
}

/// All achievements unlocked by these totals.
pub fn unlocked(totals: &ProgressTotals) -> Vec<&'static Achievement> {
    CATALOG.iter().filter(|a| a.is_unlocked(totals)).collect()
}
