use rand::Rng;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

/// Synthesizes a random-dot patch on a transparent background, used for
/// test-mode runs when no pre-rendered patch assets are available.
pub fn random_dot_patch<R: Rng>(
    rng: &mut R,
    size: u32,
    dot_count: usize,
    color: [u8; 4],
) -> Pixmap {
    let mut pixmap = Pixmap::new(size, size).expect("patch size must be non-zero");
    let mut pb = PathBuilder::new();
    let margin = size as f32 * 0.1;
    for _ in 0..dot_count {
        let x = rng.random_range(margin..size as f32 - margin);
        let y = rng.random_range(margin..size as f32 - margin);
        let radius = rng.random_range(1.5..3.5f32);
        pb.push_circle(x, y, radius);
    }
    if let Some(path) = pb.finish() {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
    pixmap
}
