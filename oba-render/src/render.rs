use anyhow::{Result, anyhow};
use oba_core::{FrameView, ScreenState};
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Transform,
};

const BACKGROUND: [u8; 4] = [128, 128, 128, 255];
const FIXATION_RADIUS_PX: f32 = 8.0;

/// Draws one frame of the experiment from a `FrameView`. The two patch
/// pixmaps are superimposed at the screen center; tilt is applied as a
/// rotation about each patch's own center.
pub struct StimulusRenderer {
    center_x: f32,
    center_y: f32,
    patches: [Pixmap; 2],
}

impl StimulusRenderer {
    pub fn new(width: u32, height: u32, patch1: Pixmap, patch2: Pixmap) -> Self {
        Self {
            center_x: width as f32 / 2.0,
            center_y: height as f32 / 2.0,
            patches: [patch1, patch2],
        }
    }

    /// Re-centers the scene after a surface resize; the patches stay as is.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.center_x = width as f32 / 2.0;
        self.center_y = height as f32 / 2.0;
    }

    pub fn render_frame(&self, canvas: &mut Pixmap, view: &FrameView) -> Result<()> {
        match &view.screen {
            ScreenState::Blank => {
                self.fill(canvas, BACKGROUND);
            }
            ScreenState::Fixation { color } => {
                self.fill(canvas, BACKGROUND);
                self.draw_fixation(canvas, *color)?;
            }
            ScreenState::Stimulus { patches, cued } => {
                self.fill(canvas, BACKGROUND);
                // Patch two is drawn first so patch one sits on top.
                for index in [1usize, 0] {
                    let patch_view = patches[index];
                    if patch_view.visible {
                        self.draw_patch(canvas, index, patch_view.tilt_deg);
                    }
                }
                self.draw_fixation(canvas, cued.cue_color())?;
            }
            ScreenState::EndScreen => {
                self.fill(canvas, [255, 255, 255, 255]);
            }
        }
        Ok(())
    }

    fn fill(&self, canvas: &mut Pixmap, color: [u8; 4]) {
        canvas.fill(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    }

    fn draw_patch(&self, canvas: &mut Pixmap, index: usize, tilt_deg: f32) {
        let patch = &self.patches[index];
        let x = self.center_x - patch.width() as f32 / 2.0;
        let y = self.center_y - patch.height() as f32 / 2.0;
        let transform = Transform::from_rotate_at(tilt_deg, self.center_x, self.center_y);
        canvas.draw_pixmap(
            x as i32,
            y as i32,
            patch.as_ref(),
            &PixmapPaint::default(),
            transform,
            None,
        );
    }

    fn draw_fixation(&self, canvas: &mut Pixmap, color: [u8; 4]) -> Result<()> {
        let mut pb = PathBuilder::new();
        pb.push_circle(self.center_x, self.center_y, FIXATION_RADIUS_PX);
        let path = pb.finish().ok_or_else(|| anyhow!("fixation path is empty"))?;
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        Ok(())
    }
}
