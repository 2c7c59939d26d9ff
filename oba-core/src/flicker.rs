/// Number of display frames one flicker cycle of a patch spans.
pub fn frames_per_cycle(refresh_rate: f64, flicker_hz: f64) -> f64 {
    refresh_rate / flicker_hz
}

/// Duty-cycle gating: a patch is drawn only during the first half of its
/// flicker cycle. Pure function of the frame index so the flicker phase is
/// locked to the trial's frame counter, never to wall-clock time.
pub fn is_visible(frame: usize, frames_per_cycle: f64) -> bool {
    let phase = (frame as f64) % frames_per_cycle;
    phase < frames_per_cycle / 2.0
}
