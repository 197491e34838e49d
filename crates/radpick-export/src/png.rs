//! PNG encoding and file naming for debug overlays.

use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::ExportError;

/// Encode an RGBA image as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::Image`] if PNG encoding fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// File name for a debug overlay: `DebugTexture_{surface}_{unix_seconds}.png`.
///
/// Characters other than ASCII alphanumerics, `-` and `_` in the surface
/// name are replaced with `_` so the result is a single path component.
#[must_use]
pub fn debug_file_name(surface_name: &str, unix_seconds: u64) -> String {
    let name: String = surface_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("DebugTexture_{name}_{unix_seconds}.png")
}
