pub mod config;
pub mod evaluate;
pub mod log;
pub mod marker;
pub mod schedule;
pub mod session;
pub mod staircase;

pub use config::{ExperimentConfig, KeyBindings, KeyboardLayout};
pub use evaluate::{TrialOutcome, evaluate};
pub use log::{RUNNING_WINDOW, SessionLog};
pub use marker::{MarkerSink, NullMarker};
pub use schedule::{ScheduledEvent, condition_sequence, schedule_events};
pub use session::{KeyAction, SessionController, TickFlow};
pub use staircase::{MAX_MAGNITUDE, MIN_MAGNITUDE, next_magnitude, tilt_step};
