/// Tilt magnitude bounds, tenths of a degree. Saturation at either bound is
/// expected behavior, not an error.
pub const MIN_MAGNITUDE: i32 = 1;
pub const MAX_MAGNITUDE: i32 = 99;

/// Largest single-trial adjustment, tenths of a degree.
pub const MAX_STEP: i32 = 10;

/// Signed tilt adjustment for the next trial, tenths of a degree.
///
/// Linear in the performance gap: running performance below target makes
/// the tilt larger (easier), above target smaller (harder). The divisor is
/// a tunable gain; the function is pure so the policy can be retuned and
/// tested in isolation.
pub fn tilt_step(target_pct: f64, running_pct: f64) -> i32 {
    let step = ((target_pct - running_pct) / 4.0).round() as i32;
    step.clamp(-MAX_STEP, MAX_STEP)
}

/// Applies a step and clamps into the valid magnitude range.
pub fn next_magnitude(prev_magnitude: i32, step: i32) -> i32 {
    (prev_magnitude + step).clamp(MIN_MAGNITUDE, MAX_MAGNITUDE)
}
