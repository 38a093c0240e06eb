//! # Focusroom Core Library
//!
//! This library provides the core logic for Focusroom, a shared virtual
//! study room: synchronized study/break timers, room presence, membership
//! lifecycle, and focus-time accounting. The CLI binary and any GUI shell
//! are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: an explicit state machine driven by the caller's
//!   `tick()`; session expiry flips study/break synchronously in the same
//!   tick, so no zero-countdown state is ever observable
//! - **Presence**: a per-room roster rebuilt from full syncs, with
//!   advisory join/leave events in between
//! - **Membership**: latched join, a single idempotent teardown for every
//!   exit signal, a 30-second heartbeat, and a best-effort beacon for page
//!   teardown
//! - **Accounting**: pure conversion of elapsed time into focus credit,
//!   experience, level, and streaks
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: shared countdown state machine
//! - [`MembershipManager`]: join/leave/cleanup orchestration
//! - [`PresenceTracker`]: live participant roster
//! - [`RoomBackend`]: contract for the hosted room service

pub mod accounting;
pub mod achievements;
pub mod backend;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod membership;
pub mod outbox;
pub mod presence;
pub mod room;
pub mod session;
pub mod timer;

pub use accounting::ProgressTotals;
pub use backend::{HttpBackend, LocalBackend, RoomBackend};
pub use channel::{LocalPresenceChannel, PresenceChannel};
pub use config::Config;
pub use error::{BackendError, ConfigError, CoreError, JoinError, ValidationError};
pub use events::Event;
pub use membership::{ExitSignal, LeaveOutcome, MembershipConfig, MembershipManager};
pub use outbox::{ChatOutbox, CommandState, PendingMessage};
pub use presence::{PresenceEvent, PresenceRecord, PresenceStatus, PresenceTracker};
pub use room::{Room, RoomId, RoomTimerUpdate};
pub use session::StudySession;
pub use timer::{SessionType, TimerEngine, TimerSettings, TimerState};
