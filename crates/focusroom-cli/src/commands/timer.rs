use clap::Subcommand;
use focusroom_core::Config;

use crate::common;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the countdown
    Start,
    /// Stop the countdown and finalize the elapsed measurement
    Stop,
    /// Reset the current session to its configured duration
    Reset,
    /// Rewrite the current session type's duration (stops a running timer)
    SetDuration { minutes: u64 },
    /// Advance the countdown by N seconds
    Tick {
        #[arg(default_value_t = 1)]
        secs: u64,
    },
    /// Print current timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let path = common::timer_state_path()?;
    let mut engine = common::load_engine(&path, &config);

    match action {
        TimerAction::Start => {
            if let Some(event) = engine.start() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            }
        }
        TimerAction::Stop => {
            if let Some(stopped) = engine.stop() {
                println!("{}", serde_json::to_string_pretty(&stopped.event)?);
                if let Some(measurement) = stopped.creditable {
                    println!(
                        "Creditable run: {}",
                        common::format_duration(measurement.elapsed_secs)
                    );
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            }
        }
        TimerAction::Reset => {
            if let Some(event) = engine.reset() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
        }
        TimerAction::SetDuration { minutes } => {
            engine.set_custom_duration(minutes)?;
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        TimerAction::Tick { secs } => {
            for _ in 0..secs {
                if let Some(event) = engine.tick() {
                    println!("{}", serde_json::to_string_pretty(&event)?);
                }
            }
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        TimerAction::Status => {
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
    }

    common::save_engine(&path, &engine)?;
    Ok(())
}
