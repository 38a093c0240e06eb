//! End-to-end membership lifecycle scenarios.
//!
//! Drives the real manager against the in-process backend and presence
//! channel: capacity limits, interleaved join/teardown storms, the dual
//! beacon/cleanup exit path, and convergence of the shared room timer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use focusroom_core::backend::RoomBackend;
use focusroom_core::error::{BackendError, JoinError};
use focusroom_core::{
    ExitSignal, LocalBackend, LocalPresenceChannel, MembershipConfig, MembershipManager,
    PresenceEvent, PresenceRecord, PresenceTracker, Room, RoomTimerUpdate, SessionType,
    TimerEngine, TimerSettings, TimerState,
};

fn profile(id: &str) -> PresenceRecord {
    PresenceRecord::new(id, format!("User {id}"), format!("avatar-{id}"), 1)
}

fn make_room(backend: &LocalBackend, capacity: u32) -> Room {
    backend
        .create_room("Quiet Hall", "Math", capacity, "creator", &TimerSettings::default())
        .unwrap()
}

fn manager_with(backend: &Arc<LocalBackend>, channel: &Arc<LocalPresenceChannel>) -> MembershipManager {
    MembershipManager::with_config(
        Arc::clone(backend) as Arc<dyn RoomBackend>,
        Arc::clone(channel) as Arc<dyn focusroom_core::PresenceChannel>,
        MembershipConfig {
            heartbeat_interval: Duration::from_millis(25),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn ninth_join_fails_on_a_room_of_eight() {
    let backend = Arc::new(LocalBackend::new());
    let channel = Arc::new(LocalPresenceChannel::new());
    let room = make_room(&backend, 8);

    for i in 0..7 {
        backend.join_room(&room.id, &format!("seed{i}")).await.unwrap();
    }

    let mut eighth = manager_with(&backend, &channel);
    eighth.join(&room.id, profile("u8")).await.unwrap();
    assert_eq!(backend.room(&room.id).unwrap().participant_count, 8);

    let mut ninth = manager_with(&backend, &channel);
    let err = ninth.join(&room.id, profile("u9")).await.unwrap_err();
    assert!(matches!(
        err,
        focusroom_core::CoreError::Join(JoinError::RoomFull { capacity: 8, .. })
    ));
    // the refused join performed no state mutation
    assert_eq!(backend.room(&room.id).unwrap().participant_count, 8);
    assert_eq!(backend.open_session_count(&room.id, "u9"), 0);
    assert!(!ninth.is_joined());

    eighth.leave().await;
}

#[tokio::test]
async fn every_join_cleanup_interleaving_leaves_at_most_one_open_session() {
    // Exhaustively run all bounded sequences of join/cleanup operations on
    // the same (room, user). Whatever the order, at most one session stays
    // open, and extra cleanups stay side-effect free.
    const OPS: usize = 6;
    for mask in 0u32..(1 << OPS) {
        let backend = Arc::new(LocalBackend::new());
        let channel = Arc::new(LocalPresenceChannel::new());
        let room = make_room(&backend, 4);
        let mut manager = manager_with(&backend, &channel);

        for bit in 0..OPS {
            if mask & (1 << bit) != 0 {
                manager.join(&room.id, profile("u1")).await.unwrap();
            } else {
                manager.cleanup(ExitSignal::VisibilityHidden).await;
            }
        }

        let open = backend.open_session_count(&room.id, "u1");
        assert!(open <= 1, "sequence {mask:#b} left {open} open sessions");

        let sessions_before = backend.profile("u1").sessions_completed;
        manager.cleanup(ExitSignal::Explicit).await;
        manager.cleanup(ExitSignal::PageHide).await;
        assert_eq!(backend.open_session_count(&room.id, "u1"), 0);
        // repeated teardown credits nothing extra; short sessions may not
        // credit at all, so only equality after settling matters
        let sessions_after = backend.profile("u1").sessions_completed;
        assert!(sessions_after >= sessions_before);
        let settled = backend.profile("u1").sessions_completed;
        manager.cleanup(ExitSignal::BeforeUnload).await;
        assert_eq!(backend.profile("u1").sessions_completed, settled);
    }
}

#[tokio::test]
async fn unload_storm_fires_one_beacon_and_one_cleanup() {
    let backend = Arc::new(LocalBackend::new());
    let channel = Arc::new(LocalPresenceChannel::new());
    let room = make_room(&backend, 4);
    let mut manager = manager_with(&backend, &channel);

    manager.join(&room.id, profile("u1")).await.unwrap();
    backend.backdate_open_session(&room.id, "u1", 300);

    // visibilitychange, beforeunload and pagehide all fire for one leave
    manager.signal_exit(ExitSignal::VisibilityHidden).await;
    manager.signal_exit(ExitSignal::BeforeUnload).await;
    manager.signal_exit(ExitSignal::PageHide).await;

    assert_eq!(backend.leave_call_count(), 1);
    // the teardown latch was already set, so no beacon went out either
    assert_eq!(backend.beacon_count(), 0);
    assert_eq!(backend.profile("u1").sessions_completed, 1);
    assert_eq!(backend.open_session_count(&room.id, "u1"), 0);
}

#[tokio::test]
async fn presence_roster_follows_membership() {
    let backend = Arc::new(LocalBackend::new());
    let channel = Arc::new(LocalPresenceChannel::new());
    let room = make_room(&backend, 4);

    let mut rx = channel.subscribe();
    let mut tracker = PresenceTracker::new();

    let mut alice = manager_with(&backend, &channel);
    let mut bob = manager_with(&backend, &channel);
    alice.join(&room.id, profile("alice")).await.unwrap();
    bob.join(&room.id, profile("bob")).await.unwrap();

    while let Ok(event) = rx.try_recv() {
        tracker.apply(event);
    }
    assert_eq!(tracker.len(), 2);

    bob.leave().await;
    while let Ok(event) = rx.try_recv() {
        tracker.apply(event);
    }
    assert_eq!(tracker.len(), 1);
    assert!(tracker.contains("alice"));

    alice.leave().await;
}

#[tokio::test]
async fn late_subscriber_rebuilds_roster_from_sync_alone() {
    let backend = Arc::new(LocalBackend::new());
    let channel = Arc::new(LocalPresenceChannel::new());
    let room = make_room(&backend, 4);

    let mut alice = manager_with(&backend, &channel);
    let mut bob = manager_with(&backend, &channel);
    alice.join(&room.id, profile("alice")).await.unwrap();
    bob.join(&room.id, profile("bob")).await.unwrap();
    bob.leave().await;

    // subscribed after every advisory event was gone
    let mut rx = channel.subscribe();
    let mut tracker = PresenceTracker::new();
    while let Ok(event) = rx.try_recv() {
        tracker.apply(event);
    }
    assert_eq!(tracker.len(), 1);
    assert!(tracker.contains("alice"));

    alice.leave().await;
}

#[tokio::test]
async fn ghost_participant_is_reaped_by_staleness_policy() {
    let backend = Arc::new(LocalBackend::new());
    let room = make_room(&backend, 4);

    // a client that died without any exit signal
    backend.join_room(&room.id, "ghost").await.unwrap();

    let later = Utc::now() + chrono::Duration::seconds(300);
    let reaped = backend.reap_stale(chrono::Duration::seconds(120), later);
    assert_eq!(reaped, vec![(room.id.clone(), "ghost".to_string())]);
    assert_eq!(backend.room(&room.id).unwrap().participant_count, 0);
    assert_eq!(backend.open_session_count(&room.id, "ghost"), 0);
}

#[tokio::test]
async fn shared_timer_converges_across_two_clients() {
    let backend = Arc::new(LocalBackend::new());
    let room = make_room(&backend, 4);

    let mut a = TimerEngine::default();
    let mut b = TimerEngine::default();
    a.start();
    b.start();

    // A drives for ten seconds and writes back.
    for _ in 0..10 {
        a.tick();
    }
    backend
        .update_room_timer(&room.id, a.timer_update())
        .await
        .unwrap();

    // B adopts the shared value before its own tick instead of
    // decrementing its stale local copy.
    let shared = backend.room(&room.id).unwrap();
    b.sync_shared(shared.remaining_secs, shared.session_type);
    b.tick();

    assert_eq!(b.remaining_secs(), 1489);
    assert_eq!(b.state(), TimerState::Running);
}

#[tokio::test]
async fn study_expiry_preloads_break_in_room_state() {
    let backend = Arc::new(LocalBackend::new());
    let room = make_room(&backend, 4);

    let settings = TimerSettings::new(25, 5).unwrap();
    let mut engine = TimerEngine::new(settings);
    engine.start();

    let mut completed = None;
    for _ in 0..1500 {
        if let Some(event) = engine.tick() {
            completed = Some(event);
        }
    }
    assert!(matches!(
        completed,
        Some(focusroom_core::Event::SessionCompleted {
            session_type: SessionType::Study,
            ..
        })
    ));

    backend
        .update_room_timer(&room.id, engine.timer_update())
        .await
        .unwrap();
    let shared = backend.room(&room.id).unwrap();
    assert_eq!(shared.session_type, SessionType::Break);
    assert_eq!(shared.remaining_secs, 300);
    assert!(shared.is_studying);
}

/// Backend whose leave procedure always fails; the manager must still
/// complete the leave transition.
struct UnreachableOnLeave {
    inner: LocalBackend,
}

#[async_trait]
impl RoomBackend for UnreachableOnLeave {
    async fn join_room(&self, room_id: &str, user_id: &str) -> Result<(), JoinError> {
        self.inner.join_room(room_id, user_id).await
    }

    async fn leave_room(&self, _room_id: &str, _user_id: &str) -> Result<u64, BackendError> {
        Err(BackendError::Network("connection reset".into()))
    }

    async fn heartbeat(
        &self,
        room_id: &str,
        user_id: &str,
        at: chrono::DateTime<Utc>,
    ) -> Result<(), BackendError> {
        self.inner.heartbeat(room_id, user_id, at).await
    }

    async fn send_beacon(&self, _room_id: &str, _user_id: &str) -> Result<(), BackendError> {
        Err(BackendError::Network("connection reset".into()))
    }

    async fn update_room_timer(
        &self,
        room_id: &str,
        update: RoomTimerUpdate,
    ) -> Result<(), BackendError> {
        self.inner.update_room_timer(room_id, update).await
    }

    async fn evaluate_achievements(&self, user_id: &str) -> Result<(), BackendError> {
        self.inner.evaluate_achievements(user_id).await
    }
}

#[tokio::test]
async fn leave_transition_survives_backend_outage() {
    let inner = LocalBackend::new();
    let room = make_room(&inner, 4);
    let backend = Arc::new(UnreachableOnLeave { inner });
    let channel = Arc::new(LocalPresenceChannel::new());

    let mut manager = MembershipManager::new(
        Arc::clone(&backend) as Arc<dyn RoomBackend>,
        Arc::clone(&channel) as Arc<dyn focusroom_core::PresenceChannel>,
    );
    manager.join(&room.id, profile("u1")).await.unwrap();

    // both the beacon and the leave call fail; the user still gets out
    let outcome = manager.signal_exit(ExitSignal::BeforeUnload).await;
    assert!(!outcome.already_cleaning);
    assert_eq!(outcome.focus_delta_secs, 0);
    assert!(!manager.is_joined());

    let session = outcome.session.expect("local session is still finalized");
    assert!(!session.is_open());
}

#[tokio::test]
async fn status_updates_are_last_write_wins() {
    let backend = Arc::new(LocalBackend::new());
    let channel = Arc::new(LocalPresenceChannel::new());
    let room = make_room(&backend, 4);

    let mut rx = channel.subscribe();
    let mut tracker = PresenceTracker::new();

    let mut manager = manager_with(&backend, &channel);
    manager.join(&room.id, profile("u1")).await.unwrap();
    manager
        .update_status(focusroom_core::PresenceStatus::Focus)
        .await;
    manager
        .update_status(focusroom_core::PresenceStatus::Break)
        .await;

    while let Ok(event) = rx.try_recv() {
        tracker.apply(event);
    }
    assert_eq!(
        tracker.get("u1").unwrap().status,
        focusroom_core::PresenceStatus::Break
    );

    manager.leave().await;
    drop(rx);
    // the roster can always be rebuilt from the final sync
    let mut fresh = PresenceTracker::new();
    let mut rx2 = channel.subscribe();
    while let Ok(event) = rx2.try_recv() {
        if let PresenceEvent::Sync { .. } = event {
            fresh.apply(event);
        }
    }
    assert!(fresh.is_empty());
}
