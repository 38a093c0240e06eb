//! Backend contracts for the hosted room service.
//!
//! The server side of these calls (stored procedures, staleness policy,
//! room janitor) lives outside this crate; everything here is consumed
//! through the trait. `LocalBackend` is a faithful in-process stand-in used
//! by tests and the CLI, `HttpBackend` talks to a hosted deployment.

mod http;
mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{BackendError, JoinError};
use crate::room::RoomTimerUpdate;

pub use http::HttpBackend;
pub use local::{LocalBackend, LocalState, MAX_ROOM_CAPACITY};

#[async_trait]
pub trait RoomBackend: Send + Sync {
    /// Register (room, user). Safely retryable; failures carry a structured
    /// reason and imply no partial state.
    async fn join_room(&self, room_id: &str, user_id: &str) -> Result<(), JoinError>;

    /// Close the user's participation. Idempotent; returns the focus-time
    /// delta (seconds) of the closed session, 0 when nothing was open.
    async fn leave_room(&self, room_id: &str, user_id: &str) -> Result<u64, BackendError>;

    /// Fire-and-forget liveness refresh.
    async fn heartbeat(
        &self,
        room_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), BackendError>;

    /// Best-effort delivery path usable during page teardown.
    async fn send_beacon(&self, room_id: &str, user_id: &str) -> Result<(), BackendError>;

    /// Write back the shared room countdown.
    async fn update_room_timer(
        &self,
        room_id: &str,
        update: RoomTimerUpdate,
    ) -> Result<(), BackendError>;

    /// Post-leave achievement evaluation trigger; side effect only.
    async fn evaluate_achievements(&self, user_id: &str) -> Result<(), BackendError>;
}
