mod engine;
mod settings;

pub use engine::{FocusMeasurement, StoppedRun, TimerEngine, TimerState};
pub use settings::{SessionType, TimerSettings, MAX_SESSION_MINUTES, MIN_SESSION_MINUTES};
