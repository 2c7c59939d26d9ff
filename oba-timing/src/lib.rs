pub mod clock;

pub use clock::{Clock, FrameMonitor, FrameStats, ManualClock, MonotonicClock};
