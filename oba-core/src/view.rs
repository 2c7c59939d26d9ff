use crate::patch::PatchId;

/// What one patch looks like on the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchView {
    pub visible: bool,
    /// Tilt applied this frame, in degrees (0.0 outside event windows).
    pub tilt_deg: f32,
}

/// Everything the renderer needs for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState {
    Blank,
    /// Fixation disc only, in the given RGBA color.
    Fixation { color: [u8; 4] },
    /// Flickering patches plus the cue-colored fixation disc.
    Stimulus {
        patches: [PatchView; 2],
        cued: PatchId,
    },
    /// White screen shown once the session is over.
    EndScreen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub screen: ScreenState,
}

impl FrameView {
    pub fn blank() -> Self {
        FrameView {
            screen: ScreenState::Blank,
        }
    }
}
