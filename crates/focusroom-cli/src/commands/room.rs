use std::sync::Arc;

use clap::Subcommand;
use focusroom_core::backend::RoomBackend;
use focusroom_core::{
    Config, Event, LocalBackend, LocalPresenceChannel, MembershipManager, PresenceRecord,
    PresenceStatus, TimerEngine,
};

use crate::common;

/// How often the simulated timer writes back to the shared room row.
const WRITE_BACK_EVERY_SECS: u64 = 30;

#[derive(Subcommand)]
pub enum RoomAction {
    /// Create a new study room
    Create {
        name: String,
        #[arg(long, default_value = "General")]
        subject: String,
        #[arg(long, default_value_t = 8)]
        capacity: u32,
        #[arg(long, default_value = "local-user")]
        creator: String,
    },
    /// List rooms, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one room
    Status {
        room_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Join a room
    Join {
        room_id: String,
        #[arg(long)]
        user: String,
    },
    /// Leave a room
    Leave {
        room_id: String,
        #[arg(long)]
        user: String,
    },
    /// Run a simulated focus block: join, drive the shared timer, leave
    Focus {
        room_id: String,
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 25)]
        minutes: u64,
    },
    /// Reap stale participants and delete abandoned empty rooms
    Sweep,
}

pub async fn run(action: RoomAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let state_path = common::rooms_state_path()?;
    let backend = Arc::new(LocalBackend::load(&state_path)?);

    match action {
        RoomAction::Create {
            name,
            subject,
            capacity,
            creator,
        } => {
            let room =
                backend.create_room(name, subject, capacity, &creator, &config.timer_settings()?)?;
            println!("Room created: {} ({})", room.id, room.name);
        }
        RoomAction::List { json } => {
            let rooms = backend.rooms();
            if json {
                println!("{}", serde_json::to_string_pretty(&rooms)?);
            } else if rooms.is_empty() {
                println!("No rooms.");
            } else {
                for room in rooms {
                    println!(
                        "{}  {:<20} {:<12} {}/{}  {} {}",
                        room.id,
                        room.name,
                        room.subject,
                        room.participant_count,
                        room.capacity,
                        room.session_type.label(),
                        common::format_clock(room.remaining_secs),
                    );
                }
            }
        }
        RoomAction::Status { room_id, json } => {
            let room = backend
                .room(&room_id)
                .ok_or_else(|| format!("room not found: {room_id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&room)?);
            } else {
                println!("{} ({})", room.name, room.subject);
                println!(
                    "  participants: {}/{}",
                    room.participant_count, room.capacity
                );
                println!(
                    "  timer: {} {} ({})",
                    room.session_type.label(),
                    common::format_clock(room.remaining_secs),
                    if room.is_studying { "running" } else { "idle" },
                );
                println!(
                    "  total focus time: {}",
                    common::format_duration(room.total_study_secs)
                );
            }
        }
        RoomAction::Join { room_id, user } => {
            backend.join_room(&room_id, &user).await?;
            println!("Joined {room_id} as {user}");
        }
        RoomAction::Leave { room_id, user } => {
            let delta = backend.leave_room(&room_id, &user).await?;
            println!(
                "Left {room_id}; credited {}",
                common::format_duration(delta)
            );
        }
        RoomAction::Focus {
            room_id,
            user,
            minutes,
        } => {
            focus_block(&backend, &config, &room_id, &user, minutes).await?;
        }
        RoomAction::Sweep => {
            let now = chrono::Utc::now();
            let stale = chrono::Duration::seconds(config.presence.stale_after_secs as i64);
            let reaped = backend.reap_stale(stale, now);
            let swept = backend.sweep_empty_rooms(chrono::Duration::minutes(2), now);
            println!(
                "Reaped {} stale participant(s), deleted {} empty room(s)",
                reaped.len(),
                swept.len()
            );
        }
    }

    backend.persist(&state_path)?;
    Ok(())
}

/// Full lifecycle in one invocation: join through the membership manager,
/// tick the shared countdown for the requested span, then leave. The wall
/// clock is simulated by backdating the opened session.
async fn focus_block(
    backend: &Arc<LocalBackend>,
    config: &Config,
    room_id: &str,
    user: &str,
    minutes: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let channel = Arc::new(LocalPresenceChannel::new());
    let mut manager = MembershipManager::with_config(
        Arc::clone(backend) as Arc<dyn RoomBackend>,
        channel,
        config.membership(),
    );

    let level = backend.profile(user).level;
    manager
        .join(room_id, PresenceRecord::new(user, user, "avatar-1", level))
        .await?;
    manager.update_status(PresenceStatus::Focus).await;

    let mut engine = TimerEngine::new(config.timer_settings()?);
    engine.start();
    let total_secs = minutes.saturating_mul(60);
    for elapsed in 1..=total_secs {
        if let Some(Event::SessionCompleted {
            session_type,
            next_type,
            ..
        }) = engine.tick()
        {
            println!(
                "{} session complete, switching to {}",
                session_type.label(),
                next_type.label()
            );
        }
        if elapsed % WRITE_BACK_EVERY_SECS == 0 {
            backend.update_room_timer(room_id, engine.timer_update()).await?;
        }
    }
    backend.update_room_timer(room_id, engine.timer_update()).await?;

    // Simulated span: shift the session start back before leaving.
    backend.backdate_open_session(room_id, user, total_secs as i64);
    let outcome = manager.leave().await;

    let profile = backend.profile(user);
    println!(
        "Focused for {}; total {} at level {} ({} xp)",
        common::format_duration(outcome.focus_delta_secs),
        common::format_duration(profile.focus_secs),
        profile.level,
        profile.experience,
    );
    if outcome.achievements_triggered {
        let unlocked = backend.unlocked_achievements(user);
        if !unlocked.is_empty() {
            println!("Achievements: {}", unlocked.join(", "));
        }
    }
    Ok(())
}
