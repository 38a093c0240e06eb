//! Shared CLI helpers: state-file locations and display formatting.

use std::path::{Path, PathBuf};

use focusroom_core::{Config, TimerEngine};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn rooms_state_path() -> CliResult<PathBuf> {
    Ok(focusroom_core::config::data_dir()?.join("rooms.json"))
}

pub fn timer_state_path() -> CliResult<PathBuf> {
    Ok(focusroom_core::config::data_dir()?.join("timer.json"))
}

/// Load the persisted engine, falling back to a fresh one built from the
/// configured durations.
pub fn load_engine(path: &Path, config: &Config) -> TimerEngine {
    if let Ok(json) = std::fs::read_to_string(path) {
        if let Ok(engine) = serde_json::from_str::<TimerEngine>(&json) {
            return engine;
        }
    }
    config
        .timer_settings()
        .map(TimerEngine::new)
        .unwrap_or_default()
}

pub fn save_engine(path: &Path, engine: &TimerEngine) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(engine)?)?;
    Ok(())
}

/// `MM:SS`, or `HH:MM:SS` once hours are involved.
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Compact duration for stats output: `3h 25m` or `25m`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
