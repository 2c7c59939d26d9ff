use serde::{Deserialize, Serialize};

/// The two superimposed random-dot color patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchId {
    One,
    Two,
}

impl PatchId {
    /// 1-based label used in markers and progress lines.
    pub fn label(self) -> u8 {
        match self {
            PatchId::One => 1,
            PatchId::Two => 2,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PatchId::One => 0,
            PatchId::Two => 1,
        }
    }

    /// RGBA cue color shown on the fixation disc for this patch.
    pub fn cue_color(self) -> [u8; 4] {
        match self {
            PatchId::One => [255, 50, 50, 255],
            PatchId::Two => [0, 153, 255, 255],
        }
    }
}

/// Direction of a transient tilt event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiltDirection {
    Clockwise,
    CounterClockwise,
}

impl TiltDirection {
    /// Sign applied to the tilt angle; clockwise rotates negative.
    pub fn sign(self) -> f32 {
        match self {
            TiltDirection::Clockwise => -1.0,
            TiltDirection::CounterClockwise => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_one_based() {
        assert_eq!(PatchId::One.label(), 1);
        assert_eq!(PatchId::Two.label(), 2);
    }

    #[test]
    fn clockwise_tilts_negative() {
        assert_eq!(TiltDirection::Clockwise.sign(), -1.0);
        assert_eq!(TiltDirection::CounterClockwise.sign(), 1.0);
    }
}
