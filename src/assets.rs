use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tiny_skia::{ColorU8, Pixmap};

/// Decodes a patch image into a premultiplied pixmap. Any decode failure is
/// a fatal pre-flight error; nothing is recovered mid-session.
pub fn load_patch(path: &Path) -> Result<Pixmap> {
    let img = image::open(path)
        .with_context(|| format!("cannot load patch image {}", path.display()))?
        .into_rgba8();
    let (width, height) = img.dimensions();
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("patch image {} has zero size", path.display()))?;
    for (src, dst) in img.pixels().zip(pixmap.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}
