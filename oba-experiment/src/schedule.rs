use oba_core::{PatchId, TiltDirection};
use rand::Rng;
use rand::seq::SliceRandom;

/// One scheduled tilt event within a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub onset_frame: usize,
    pub patch: PatchId,
    pub direction: TiltDirection,
}

/// Draws the tilt events for one trial: zero, one or two events with equal
/// probability (so two thirds of trials contain at least one), onset frames
/// uniform over the range that leaves room for the full hold window, hold
/// windows pairwise non-overlapping. Patch and direction are independent
/// uniform draws per event. Events come back sorted by onset.
pub fn schedule_events<R: Rng>(
    rng: &mut R,
    trial_frames: usize,
    hold_frames: usize,
) -> Vec<ScheduledEvent> {
    assert!(
        trial_frames >= 2 * hold_frames,
        "trial too short for two tilt-hold windows"
    );
    let n = rng.random_range(0..=2usize);
    let max_onset = trial_frames - hold_frames;

    let mut onsets: Vec<usize> = Vec::with_capacity(n);
    while onsets.len() < n {
        let candidate = rng.random_range(0..=max_onset);
        if onsets.iter().all(|&o| o.abs_diff(candidate) >= hold_frames) {
            onsets.push(candidate);
        }
    }
    onsets.sort_unstable();

    onsets
        .into_iter()
        .map(|onset_frame| ScheduledEvent {
            onset_frame,
            patch: if rng.random_bool(0.5) {
                PatchId::One
            } else {
                PatchId::Two
            },
            direction: if rng.random_bool(0.5) {
                TiltDirection::Clockwise
            } else {
                TiltDirection::CounterClockwise
            },
        })
        .collect()
}

/// Shuffled cue assignment for the whole session: each patch is cued in
/// 3 x reps trials (two cue conditions x three tilt slots per cue).
pub fn condition_sequence<R: Rng>(rng: &mut R, reps_per_condition: usize) -> Vec<PatchId> {
    let per_cue = 3 * reps_per_condition;
    let mut cues: Vec<PatchId> = std::iter::repeat_n(PatchId::One, per_cue)
        .chain(std::iter::repeat_n(PatchId::Two, per_cue))
        .collect();
    cues.shuffle(rng);
    cues
}
