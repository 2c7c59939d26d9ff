//! Offline generator for the tilted-patch image library.
//!
//! Reads each base patch image and writes a rotated copy for every tilt
//! magnitude the staircase can reach (1..=99 tenths of a degree), in both
//! directions, plus the untilted original. The experiment then only ever
//! swaps pre-rendered files at runtime.

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tiny_skia::{ColorU8, Pixmap, PixmapPaint, Transform};

const IMAGE_ROOT: &str = "image/cyc03/FBA";
const CATEGORIES: [&str; 2] = ["image1", "image2"];
const MIN_MAGNITUDE: i32 = 1;
const MAX_MAGNITUDE: i32 = 99;

fn main() -> Result<()> {
    let root = PathBuf::from(IMAGE_ROOT);
    for category in CATEGORIES {
        let source = root.join(format!("{category}.png"));
        let base = load_pixmap(&source)?;
        println!("{category}: generating {} tilted variants", 2 * MAX_MAGNITUDE + 1);

        save_pixmap(&rotated(&base, 0.0)?, &root.join(format!("{category}_tilt0.png")))?;
        for magnitude in MIN_MAGNITUDE..=MAX_MAGNITUDE {
            let angle = magnitude as f32 / 10.0;
            save_pixmap(
                &rotated(&base, -angle)?,
                &root.join(format!("{category}_tilt{magnitude}_CW.png")),
            )?;
            save_pixmap(
                &rotated(&base, angle)?,
                &root.join(format!("{category}_tilt{magnitude}_CCW.png")),
            )?;
        }
    }
    Ok(())
}

fn load_pixmap(path: &Path) -> Result<Pixmap> {
    let img = image::open(path)
        .with_context(|| format!("cannot load base image {}", path.display()))?
        .into_rgba8();
    let (width, height) = img.dimensions();
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("{} has zero size", path.display()))?;
    for (src, dst) in img.pixels().zip(pixmap.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

fn rotated(base: &Pixmap, angle_deg: f32) -> Result<Pixmap> {
    let mut out = Pixmap::new(base.width(), base.height())
        .ok_or_else(|| anyhow!("base image has zero size"))?;
    let transform = Transform::from_rotate_at(
        angle_deg,
        base.width() as f32 / 2.0,
        base.height() as f32 / 2.0,
    );
    out.draw_pixmap(0, 0, base.as_ref(), &PixmapPaint::default(), transform, None);
    Ok(out)
}

fn save_pixmap(pixmap: &Pixmap, path: &Path) -> Result<()> {
    let mut bytes = Vec::with_capacity((pixmap.width() * pixmap.height() * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        bytes.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let img = RgbaImage::from_raw(pixmap.width(), pixmap.height(), bytes)
        .ok_or_else(|| anyhow!("pixel buffer size mismatch"))?;
    img.save(path)
        .with_context(|| format!("cannot save {}", path.display()))?;
    Ok(())
}
