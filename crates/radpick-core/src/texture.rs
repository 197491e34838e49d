//! Radargram brightness textures and the tracer-space view of them.
//!
//! A [`Texture`] stores brightness in UV orientation: texel `(x, y)`
//! covers UV `((x + 0.5) / w, (y + 0.5) / h)`, so row 0 sits at `v = 0`.
//! Decoded image files store their top row first, which is why
//! [`Texture::from_image`] flips vertically.
//!
//! The horizon tracer scans a mirrored copy, [`TracerImage`], rotated
//! 180° relative to UV space. The mirror is a fixed convention of the
//! radargram assets, computed once per texture.

use glam::Vec2;
use image::GrayImage;

/// Errors raised when decoding a radargram image.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// The image bytes were empty.
    #[error("radargram image data is empty")]
    EmptyInput,

    /// The image format is unrecognized or the data is corrupt.
    #[error("failed to decode radargram image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Brightness grid bound to a radargram surface, in UV orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    image: GrayImage,
}

impl Texture {
    /// Wrap a decoded image whose first row is the top of the picture.
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self {
            image: image::imageops::flip_vertical(image),
        }
    }

    /// Decode raw image bytes (PNG, JPEG, BMP, WebP) into a luminance
    /// texture.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::EmptyInput`] if `bytes` is empty, or
    /// [`TextureError::Decode`] if the image cannot be decoded.
    pub fn decode(bytes: &[u8]) -> Result<Self, TextureError> {
        if bytes.is_empty() {
            return Err(TextureError::EmptyInput);
        }
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&image.to_luma8()))
    }

    /// Wrap a grid that is already in UV orientation (row 0 at `v = 0`).
    #[must_use]
    pub const fn from_uv_rows(image: GrayImage) -> Self {
        Self { image }
    }

    /// Width in texels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in texels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The underlying grid in UV orientation.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Snap a UV coordinate to the centre of the texel containing it.
    ///
    /// Returns `uv` unchanged for an empty texture.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snap_uv(&self, uv: Vec2) -> Vec2 {
        let (w, h) = (self.width(), self.height());
        if w == 0 || h == 0 {
            return uv;
        }
        let x = texel_index(uv.x, w);
        let y = texel_index(uv.y, h);
        Vec2::new(
            (x as f32 + 0.5) / w as f32,
            (y as f32 + 0.5) / h as f32,
        )
    }

    /// Build the mirrored copy scanned by the horizon tracer.
    #[must_use]
    pub fn to_tracer_image(&self) -> TracerImage {
        TracerImage {
            image: image::imageops::rotate180(&self.image),
        }
    }
}

/// A texel address in tracer space: column grows away from `u = 1`,
/// row grows away from `v = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Texel {
    /// Column (0 at `u = 1`).
    pub col: u32,
    /// Row (0 at `v = 1`).
    pub row: u32,
}

impl Texel {
    /// Create a texel address.
    #[must_use]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// The texture mirrored horizontally and vertically, as the tracer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerImage {
    image: GrayImage,
}

impl TracerImage {
    /// Width in texels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in texels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The mirrored grid, for debug rendering.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Brightness at `(col, row)`, clamping the row into the image.
    ///
    /// `col` must be in range; rows are clamped because the gradient
    /// stencil reaches one row past the window.
    #[must_use]
    pub fn brightness(&self, col: u32, row: i64) -> u8 {
        let max_row = i64::from(self.height().saturating_sub(1));
        let row = u32::try_from(row.clamp(0, max_row)).unwrap_or(0);
        self.image.get_pixel(col, row).0[0]
    }

    /// Vertical brightness gradient `b(row + 1) - b(row - 1)`.
    #[must_use]
    pub fn vertical_gradient(&self, col: u32, row: i64) -> i32 {
        i32::from(self.brightness(col, row + 1)) - i32::from(self.brightness(col, row - 1))
    }

    /// Tracer-space texel containing `uv`, clamped into the image.
    #[must_use]
    pub fn uv_to_texel(&self, uv: Vec2) -> Texel {
        let (w, h) = (self.width(), self.height());
        Texel {
            col: w.saturating_sub(1) - texel_index(uv.x, w),
            row: h.saturating_sub(1) - texel_index(uv.y, h),
        }
    }

    /// UV coordinate of the centre of a tracer-space texel.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn texel_to_uv(&self, texel: Texel) -> Vec2 {
        let (w, h) = (self.width() as f32, self.height() as f32);
        Vec2::new(
            (w - texel.col as f32 - 0.5) / w,
            (h - texel.row as f32 - 0.5) / h,
        )
    }
}

/// Index of the texel containing coordinate `t` along an axis of `size`
/// texels, clamped to `0..size`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn texel_index(t: f32, size: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    let index = (t * size as f32).floor();
    if index.is_nan() || index < 0.0 {
        0
    } else {
        (index as u32).min(size - 1)
    }
}
