use crate::patch::{PatchId, TiltDirection};
use serde::{Deserialize, Serialize};

/// One logged trial. `None` in the performance/RT fields is the explicit
/// "no data" marker for zero-event trials and trials without hits; it is
/// serialized as JSON `null` and skipped by aggregate computations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_num: usize,
    pub frequency_tags: [f64; 2],
    pub cued_patch: PatchId,
    pub n_events: usize,
    pub event_frames: Vec<usize>,
    pub event_patches: Vec<PatchId>,
    pub event_directions: Vec<TiltDirection>,
    /// Tilt magnitude used this trial, in tenths of a degree.
    pub tilt_magnitude: i32,
    pub event_times_ms: Vec<f64>,
    pub response_times_ms: Vec<f64>,
    pub instant_performance: Option<f64>,
    pub avg_rt_ms: Option<f64>,
    pub cumulative_performance: Option<f64>,
    pub running_performance: Option<f64>,
}

impl TrialRecord {
    pub fn tilt_degrees(&self) -> f64 {
        self.tilt_magnitude as f64 / 10.0
    }
}
