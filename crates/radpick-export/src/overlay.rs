//! Trace overlay rendering via tiny-skia.
//!
//! The overlay is drawn in tracer space: the texture mirrored the way the
//! tracer reads it, so texel `(col, row)` of the trace lands on pixel
//! `(col, row)` of the image.

use image::{Rgba, RgbaImage};
use radpick_core::{HorizonTrace, TracerImage};
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::ExportError;

/// Colour of the traced path (opaque magenta).
pub const PATH_COLOR: [u8; 4] = [255, 0, 255, 255];

/// Colour of the scan-start marker (opaque red).
pub const START_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Path stroke width in pixels.
pub const STROKE_WIDTH: f32 = 1.5;

/// Radius of the scan-start marker in pixels.
pub const MARKER_RADIUS: i32 = 2;

/// Draw `trace` over `image`.
///
/// The texture is copied as opaque grey, the trace is stroked through
/// the centres of its texels, and the texel where the scan started is
/// marked with a filled circle.
///
/// # Errors
///
/// Returns [`ExportError::EmptyTexture`] for a zero-sized texture and
/// [`ExportError::Canvas`] if the canvas cannot be allocated.
#[allow(clippy::cast_precision_loss)]
pub fn render_debug_overlay(
    image: &TracerImage,
    trace: &HorizonTrace,
) -> Result<RgbaImage, ExportError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyTexture);
    }

    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return Err(ExportError::Canvas { width, height });
    };

    // Opaque pixels are identical premultiplied and straight.
    for (dst, src) in pixmap
        .data_mut()
        .chunks_exact_mut(4)
        .zip(image.as_image().pixels())
    {
        let v = src.0[0];
        dst.copy_from_slice(&[v, v, v, 255]);
    }

    let mut pb = PathBuilder::new();
    if let Some((first, rest)) = trace.texels.split_first() {
        pb.move_to(first.col as f32 + 0.5, first.row as f32 + 0.5);
        for t in rest {
            pb.line_to(t.col as f32 + 0.5, t.row as f32 + 0.5);
        }
    }

    // A single texel gives no path; only the marker is drawn then.
    if let Some(path) = pb.finish() {
        let stroke = Stroke {
            width: STROKE_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        let mut paint = Paint::default();
        let [r, g, b, a] = PATH_COLOR;
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    // Source-over onto an opaque background keeps every pixel opaque.
    let Some(mut overlay) = RgbaImage::from_raw(width, height, pixmap.data().to_vec()) else {
        return Err(ExportError::Canvas { width, height });
    };

    if let Some(start) = trace.scan_start() {
        let center = (
            i32::try_from(start.col).unwrap_or(i32::MAX),
            i32::try_from(start.row).unwrap_or(i32::MAX),
        );
        imageproc::drawing::draw_filled_circle_mut(&mut overlay, center, MARKER_RADIUS, START_COLOR);
    }

    Ok(overlay)
}
