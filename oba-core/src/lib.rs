pub mod flicker;
pub mod patch;
pub mod trial;
pub mod view;

pub use flicker::{frames_per_cycle, is_visible};
pub use patch::{PatchId, TiltDirection};
pub use trial::TrialRecord;
pub use view::{FrameView, PatchView, ScreenState};
