use anyhow::bail;
use oba_core::{PatchId, frames_per_cycle};
use std::path::PathBuf;
use std::str::FromStr;

/// Named key-binding sets for the supported response devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardLayout {
    Numpad,
    Mac,
}

impl FromStr for KeyboardLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numpad" => Ok(KeyboardLayout::Numpad),
            "mac" => Ok(KeyboardLayout::Mac),
            other => bail!("keyboard name '{other}' not recognized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub quit_key: &'static str,
    pub response_key: &'static str,
}

impl KeyboardLayout {
    pub fn bindings(self) -> KeyBindings {
        match self {
            KeyboardLayout::Numpad => KeyBindings {
                quit_key: "backspace",
                response_key: "num0",
            },
            KeyboardLayout::Mac => KeyBindings {
                quit_key: "escape",
                response_key: "space",
            },
        }
    }
}

/// All experiment parameters, fixed for the whole session and passed into
/// the controller at construction.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub subject_id: String,
    pub refresh_rate: u32,
    /// Flicker frequency of patch one (Hz).
    pub freq1: f64,
    /// Flicker frequency of patch two (Hz).
    pub freq2: f64,
    pub trial_seconds: u32,
    pub cue_seconds: u32,
    /// Repetitions per condition; 2 cues x 3 slots x reps trials total.
    pub reps_per_condition: usize,
    /// Maximum latency for a response to count as a hit.
    pub response_window_ms: f64,
    /// Staircase target accuracy, percent.
    pub target_performance: f64,
    /// Trial-1 tilt magnitude, tenths of a degree.
    pub seed_magnitude: i32,
    pub keyboard: KeyboardLayout,
    pub log_path: PathBuf,
    pub send_markers: bool,
    pub refresh_check_frames: usize,
    /// Allowed relative deviation of the measured frame interval.
    pub refresh_tolerance: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            subject_id: "test".to_string(),
            refresh_rate: 60,
            freq1: 12.0,
            freq2: 7.5,
            trial_seconds: 7,
            cue_seconds: 2,
            reps_per_condition: 15,
            response_window_ms: 1000.0,
            target_performance: 80.0,
            seed_magnitude: 50,
            keyboard: KeyboardLayout::Numpad,
            log_path: PathBuf::from("data/cyc03_fba_test.json"),
            send_markers: false,
            refresh_check_frames: 120,
            refresh_tolerance: 0.1,
        }
    }
}

impl ExperimentConfig {
    pub fn trial_frames(&self) -> usize {
        (self.trial_seconds * self.refresh_rate) as usize
    }

    /// Frames a tilt holds before reverting (half a second of frames).
    pub fn hold_frames(&self) -> usize {
        (self.refresh_rate / 2) as usize
    }

    pub fn cue_frames(&self) -> usize {
        (self.cue_seconds * self.refresh_rate) as usize
    }

    pub fn post_trial_frames(&self) -> usize {
        (self.refresh_rate / 2) as usize
    }

    pub fn iti_frames_min(&self) -> usize {
        (0.75 * self.refresh_rate as f64) as usize
    }

    pub fn iti_frames_max(&self) -> usize {
        (1.25 * self.refresh_rate as f64) as usize
    }

    pub fn frames_per_cycle(&self, patch: PatchId) -> f64 {
        let hz = match patch {
            PatchId::One => self.freq1,
            PatchId::Two => self.freq2,
        };
        frames_per_cycle(self.refresh_rate as f64, hz)
    }

    pub fn total_trials(&self) -> usize {
        2 * 3 * self.reps_per_condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_frame_counts_match_sixty_hz() {
        let config = ExperimentConfig::default();
        assert_eq!(config.trial_frames(), 420);
        assert_eq!(config.hold_frames(), 30);
        assert_eq!(config.cue_frames(), 120);
        assert_eq!(config.iti_frames_min(), 45);
        assert_eq!(config.iti_frames_max(), 75);
        assert_eq!(config.total_trials(), 90);
    }

    #[test]
    fn keyboard_layout_parses_known_names() {
        assert_eq!(
            "numpad".parse::<KeyboardLayout>().unwrap(),
            KeyboardLayout::Numpad
        );
        assert_eq!("mac".parse::<KeyboardLayout>().unwrap(), KeyboardLayout::Mac);
    }

    #[test]
    fn unknown_keyboard_name_is_an_error() {
        assert!("qwerty".parse::<KeyboardLayout>().is_err());
    }
}
