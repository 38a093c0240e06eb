//! Room membership lifecycle.
//!
//! One manager owns the whole join/heartbeat/teardown arc for a client.
//! Join is latched so re-entry is a no-op; every exit signal (explicit
//! leave, visibility change, page hide, unload, channel-level leave)
//! funnels into a single teardown guarded by a `cleaning_up` latch, so any
//! number of overlapping signals produce exactly one leave. Correctness
//! never depends on signal ordering, only on this idempotency.
//!
//! Failures on the teardown path are logged and swallowed: the user must
//! always be able to walk away from a room regardless of backend
//! reachability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::accounting::MIN_CREDITABLE_SECS;
use crate::backend::RoomBackend;
use crate::channel::PresenceChannel;
use crate::error::Result;
use crate::presence::{PresenceRecord, PresenceStatus};
use crate::room::RoomId;
use crate::session::StudySession;

/// Default liveness interval.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// The signal that triggered a teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignal {
    /// The leave button.
    Explicit,
    /// The tab went to the background.
    VisibilityHidden,
    /// The page is being hidden for navigation.
    PageHide,
    /// The page is being torn down.
    BeforeUnload,
    /// The presence channel reported our own key as gone.
    ChannelLeave,
}

impl ExitSignal {
    /// Page-teardown signals fire the beacon first, because the async
    /// cleanup may never get to run.
    pub fn needs_beacon(self) -> bool {
        matches!(self, ExitSignal::PageHide | ExitSignal::BeforeUnload)
    }
}

#[derive(Debug, Clone)]
pub struct MembershipConfig {
    pub heartbeat_interval: Duration,
    /// Focus deltas above this trigger achievement evaluation post-leave.
    pub achievement_threshold_secs: u64,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            achievement_threshold_secs: MIN_CREDITABLE_SECS,
        }
    }
}

/// What a teardown accomplished.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub signal: ExitSignal,
    /// Focus delta reported by the leave procedure; 0 when another path
    /// (beacon, staleness reaper) already closed the session.
    pub focus_delta_secs: u64,
    pub achievements_triggered: bool,
    /// True when the teardown short-circuited on the latch.
    pub already_cleaning: bool,
    /// The locally closed session record, present on the path that won.
    pub session: Option<StudySession>,
}

impl LeaveOutcome {
    fn short_circuit(signal: ExitSignal) -> Self {
        Self {
            signal,
            focus_delta_secs: 0,
            achievements_triggered: false,
            already_cleaning: true,
            session: None,
        }
    }
}

struct ActiveMembership {
    room_id: RoomId,
    profile: PresenceRecord,
    session: StudySession,
    cleaning_up: Arc<AtomicBool>,
    heartbeat: JoinHandle<()>,
}

impl Drop for ActiveMembership {
    fn drop(&mut self) {
        // Unmount must never leave a dangling interval behind.
        self.heartbeat.abort();
    }
}

/// Client-side join/leave orchestration for one user.
pub struct MembershipManager {
    backend: Arc<dyn RoomBackend>,
    channel: Arc<dyn PresenceChannel>,
    config: MembershipConfig,
    active: Option<ActiveMembership>,
}

impl MembershipManager {
    pub fn new(backend: Arc<dyn RoomBackend>, channel: Arc<dyn PresenceChannel>) -> Self {
        Self::with_config(backend, channel, MembershipConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn RoomBackend>,
        channel: Arc<dyn PresenceChannel>,
        config: MembershipConfig,
    ) -> Self {
        Self {
            backend,
            channel,
            config,
            active: None,
        }
    }

    pub fn is_joined(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_room(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.room_id.as_str())
    }

    pub fn open_session(&self) -> Option<&StudySession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Join a room. A no-op while already joined (to any room: one active
    /// room per user is this manager's invariant).
    pub async fn join(&mut self, room_id: &str, profile: PresenceRecord) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }

        self.backend.join_room(room_id, &profile.user_id).await?;

        // From here on everything is best effort; the join itself stands.
        if let Err(e) = self.channel.track(profile.clone()).await {
            log::warn!("presence track failed for {}: {e}", profile.user_id);
        }

        let cleaning_up = Arc::new(AtomicBool::new(false));
        let heartbeat = self.spawn_heartbeat(room_id, &profile.user_id, Arc::clone(&cleaning_up));
        let session = StudySession::open(room_id, profile.user_id.clone());
        self.active = Some(ActiveMembership {
            room_id: room_id.to_string(),
            profile,
            session,
            cleaning_up,
            heartbeat,
        });
        Ok(())
    }

    fn spawn_heartbeat(
        &self,
        room_id: &str,
        user_id: &str,
        cleaning_up: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let room_id = room_id.to_string();
        let user_id = user_id.to_string();
        let period = self.config.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // the first tick is immediate
            loop {
                ticker.tick().await;
                // Liveness check: a teardown may have started while this
                // beat was waiting.
                if cleaning_up.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = backend.heartbeat(&room_id, &user_id, Utc::now()).await {
                    log::warn!("heartbeat for room {room_id} failed: {e}");
                }
            }
        })
    }

    /// Re-publish the caller's presence record with a new status.
    pub async fn update_status(&mut self, status: PresenceStatus) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.profile.status = status;
        active.profile.reported_at = Utc::now();
        let record = active.profile.clone();
        if let Err(e) = self.channel.track(record).await {
            log::warn!("presence status publish failed: {e}");
        }
    }

    /// Explicit leave.
    pub async fn leave(&mut self) -> LeaveOutcome {
        self.signal_exit(ExitSignal::Explicit).await
    }

    /// Route an exit signal into the (single) teardown. Page-teardown
    /// signals also fire the synchronous-best-effort beacon; the server
    /// procedure is idempotent, so beacon and cleanup may both land.
    pub async fn signal_exit(&mut self, signal: ExitSignal) -> LeaveOutcome {
        if signal.needs_beacon() {
            if let Some(active) = self.active.as_ref() {
                if !active.cleaning_up.load(Ordering::SeqCst) {
                    if let Err(e) = self
                        .backend
                        .send_beacon(&active.room_id, &active.profile.user_id)
                        .await
                    {
                        log::warn!("beacon send failed: {e}");
                    }
                }
            }
        }
        self.cleanup(signal).await
    }

    /// Idempotent teardown. Safe to invoke any number of times, from any
    /// number of signal sources; only the first invocation does work.
    pub async fn cleanup(&mut self, signal: ExitSignal) -> LeaveOutcome {
        let (room_id, user_id) = match self.active.as_ref() {
            None => return LeaveOutcome::short_circuit(signal),
            Some(active) => {
                if active.cleaning_up.swap(true, Ordering::SeqCst) {
                    return LeaveOutcome::short_circuit(signal);
                }
                active.heartbeat.abort();
                (active.room_id.clone(), active.profile.user_id.clone())
            }
        };

        if let Err(e) = self.channel.untrack(&user_id).await {
            log::warn!("presence untrack failed for {user_id}: {e}");
        }

        let focus_delta_secs = match self.backend.leave_room(&room_id, &user_id).await {
            Ok(delta) => delta,
            Err(e) => {
                log::warn!("leave procedure failed for room {room_id}: {e}");
                0
            }
        };

        let mut achievements_triggered = false;
        if focus_delta_secs > self.config.achievement_threshold_secs {
            match self.backend.evaluate_achievements(&user_id).await {
                Ok(()) => achievements_triggered = true,
                Err(e) => log::warn!("achievement evaluation failed for {user_id}: {e}"),
            }
        }

        let session = self.active.take().map(|mut active| {
            active.session.close(Utc::now());
            active.session.clone()
        });

        LeaveOutcome {
            signal,
            focus_delta_secs,
            achievements_triggered,
            already_cleaning: false,
            session,
        }
    }
}
