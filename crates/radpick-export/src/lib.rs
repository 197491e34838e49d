//! radpick-export: debug images of guided horizon traces (sans-IO).
//!
//! Renders a [`HorizonTrace`](radpick_core::HorizonTrace) over the
//! texture it was traced on and encodes the result as PNG bytes. Writing
//! the bytes to disk is left to the caller.

pub mod overlay;
pub mod png;

pub use overlay::{MARKER_RADIUS, PATH_COLOR, START_COLOR, STROKE_WIDTH, render_debug_overlay};
pub use png::{debug_file_name, encode_png};

/// Errors that can occur while rendering or encoding a debug image.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The texture has no texels to draw on.
    #[error("texture is empty")]
    EmptyTexture,

    /// The rasteriser could not allocate a canvas of this size.
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}
