use clap::Subcommand;
use focusroom_core::{accounting, achievements, LocalBackend};

use crate::common;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Show progression totals for a user
    Show {
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// List achievements and their unlock state
    Achievements { user: String },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let state_path = common::rooms_state_path()?;
    let backend = LocalBackend::load(&state_path)?;

    match action {
        StatsAction::Show { user, json } => {
            let profile = backend.profile(&user);
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                println!("Stats for {user}");
                println!(
                    "  focus time: {} over {} session(s)",
                    common::format_duration(profile.focus_secs),
                    profile.sessions_completed
                );
                println!(
                    "  level {} ({} xp, {} to next)",
                    profile.level,
                    profile.experience,
                    accounting::experience_to_next_level(profile.experience)
                );
                println!(
                    "  streak: {} day(s), longest {}",
                    profile.current_streak, profile.longest_streak
                );
                println!(
                    "  rooms: {} created, {} joined",
                    profile.rooms_created, profile.rooms_joined
                );
            }
        }
        StatsAction::Achievements { user } => {
            let profile = backend.profile(&user);
            let granted = backend.unlocked_achievements(&user);
            for achievement in achievements::catalog() {
                let unlocked = achievement.is_unlocked(&profile)
                    || granted.contains(&achievement.id.to_string());
                let marker = if unlocked { "[x]" } else { "[ ]" };
                println!(
                    "{marker} {:<20} {}",
                    achievement.name, achievement.description
                );
            }
        }
    }
    Ok(())
}
