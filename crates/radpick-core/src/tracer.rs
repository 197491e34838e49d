//! Guided horizon tracing across a radargram texture.
//!
//! Given two UV endpoints on a surface, the tracer walks the texture
//! column by column between them and, in each sampled column, picks the
//! row whose brightness and vertical gradient best match those at the
//! scan's starting texel. The search is confined to a window centred
//! between the row picked in the previous column and the end row, pulled
//! harder towards the end row as the scan progresses. The path follows
//! the reflection even where it strays from the chord between the
//! endpoints, and still arrives at the end pick.
//!
//! Tracing happens in tracer space (the texture rotated 180°, see
//! [`TracerImage`]). The scan direction depends on which side of the
//! surface was hit and on the surface's `backwards` flag; the two
//! endpoints are ordered by column internally, so callers may pass them
//! in either order.

use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::TracerConfig;
use crate::diagnostics::{Clock, TraceDiagnostics};
use crate::mapping;
use crate::surface::RadargramSurface;
use crate::texture::{Texel, TracerImage};

/// Errors that prevent a guided trace from running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    /// The surface has no texture bound.
    #[error("surface has no radargram texture")]
    MissingTexture,

    /// The bound texture has no texels.
    #[error("radargram texture is empty")]
    EmptyTexture,

    /// The surface carries no orientation metadata.
    #[error("surface has no orientation metadata")]
    MissingOrientation,

    /// The surface has no mesh to map the path onto.
    #[error("surface has no mesh")]
    MissingMesh,

    /// The stride between samples is zero.
    #[error("tracer stride must be at least one texel")]
    ZeroStride,
}

/// Order in which tracer-space columns are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanDirection {
    /// From the higher-column endpoint towards column 0 (front-facing hit).
    DecreasingColumn,
    /// From the lower-column endpoint upwards (back-facing hit).
    IncreasingColumn,
}

impl ScanDirection {
    /// Pick the scan direction for a hit with `normal` on a surface.
    ///
    /// A hit is front-facing when `normal · forward > 0`; `backwards`
    /// surfaces invert that.
    #[must_use]
    pub fn for_hit(normal: Vec3, forward: Vec3, backwards: bool) -> Self {
        let front = normal.dot(forward) > 0.0;
        if front != backwards {
            Self::DecreasingColumn
        } else {
            Self::IncreasingColumn
        }
    }
}

impl fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecreasingColumn => f.write_str("decreasing"),
            Self::IncreasingColumn => f.write_str("increasing"),
        }
    }
}

/// The result of a guided trace.
///
/// `texels` and `uvs` hold every sample in scan order; `world` holds only
/// those that mapped onto the mesh, so `world.len() + dropped ==
/// texels.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonTrace {
    /// Which way the columns were scanned.
    pub direction: ScanDirection,
    /// Picked texel per sampled column, in tracer space.
    pub texels: Vec<Texel>,
    /// Texel centres as UV coordinates.
    pub uvs: Vec<Vec2>,
    /// World-space path.
    pub world: Vec<Vec3>,
    /// Samples that fell off the mesh.
    pub dropped: usize,
}

impl HorizonTrace {
    /// The texel the scan started from, where the seed values were read.
    #[must_use]
    pub fn scan_start(&self) -> Option<Texel> {
        self.texels.first().copied()
    }
}

/// Brightness and gradient at the scan-start texel.
#[derive(Debug, Clone, Copy)]
struct Seed {
    brightness: i32,
    gradient: i32,
}

impl Seed {
    fn read(image: &TracerImage, texel: Texel) -> Self {
        let row = i64::from(texel.row);
        Self {
            brightness: i32::from(image.brightness(texel.col, row)),
            gradient: image.vertical_gradient(texel.col, row),
        }
    }

    /// Lower is a better match.
    fn score(self, image: &TracerImage, col: u32, row: i64) -> i32 {
        let brightness = i32::from(image.brightness(col, row));
        let gradient = image.vertical_gradient(col, row);
        (brightness - self.brightness).abs() + (gradient - self.gradient).abs() / 2
    }
}

/// Guided ridge tracer with a fixed window and stride.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonTracer {
    config: TracerConfig,
    stride: u32,
}

impl HorizonTracer {
    /// A tracer sampling every `stride` texels.
    #[must_use]
    pub const fn new(config: TracerConfig, stride: u32) -> Self {
        Self { config, stride }
    }

    /// Texels between consecutive samples.
    #[must_use]
    pub const fn stride(&self) -> u32 {
        self.stride
    }

    /// Window and direction settings.
    #[must_use]
    pub const fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Trace the horizon between `start_uv` and `end_uv` on `surface`.
    ///
    /// `hit_normal` is the world-space normal at the starting pick and
    /// selects the scan direction.
    ///
    /// # Errors
    ///
    /// Returns a [`TraceError`] if the stride is zero or the surface is
    /// missing its texture, orientation or mesh.
    pub fn trace(
        &self,
        surface: &RadargramSurface,
        start_uv: Vec2,
        end_uv: Vec2,
        hit_normal: Vec3,
    ) -> Result<HorizonTrace, TraceError> {
        if self.stride == 0 {
            return Err(TraceError::ZeroStride);
        }
        let image = surface.tracer_image().ok_or(TraceError::MissingTexture)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TraceError::EmptyTexture);
        }
        let orientation = surface
            .orientation()
            .ok_or(TraceError::MissingOrientation)?;
        let mesh = surface.mesh().ok_or(TraceError::MissingMesh)?;

        let a = image.uv_to_texel(start_uv);
        let b = image.uv_to_texel(end_uv);
        let (low, high) = if a.col <= b.col { (a, b) } else { (b, a) };

        let direction = ScanDirection::for_hit(
            hit_normal,
            self.config.reference_forward,
            orientation.backwards,
        );
        let (from, to) = match direction {
            ScanDirection::DecreasingColumn => (high, low),
            ScanDirection::IncreasingColumn => (low, high),
        };

        let texels = self.scan(image, direction, from, to);
        let uvs: Vec<Vec2> = texels.iter().map(|&t| image.texel_to_uv(t)).collect();
        let world: Vec<Vec3> = uvs
            .iter()
            .filter_map(|&uv| mapping::uv_to_world(uv, mesh, surface.transform()))
            .collect();
        let dropped = uvs.len() - world.len();

        if dropped > 0 {
            log::debug!(
                "{}: {dropped} of {} traced samples fell off the mesh",
                surface.name(),
                uvs.len()
            );
        }

        Ok(HorizonTrace {
            direction,
            texels,
            uvs,
            world,
            dropped,
        })
    }

    /// [`trace`](Self::trace), timed with `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`trace`](Self::trace).
    pub fn trace_with_diagnostics<C: Clock>(
        &self,
        surface: &RadargramSurface,
        start_uv: Vec2,
        end_uv: Vec2,
        hit_normal: Vec3,
        clock: &C,
    ) -> Result<(HorizonTrace, TraceDiagnostics), TraceError> {
        let started = clock.now();
        let trace = self.trace(surface, start_uv, end_uv, hit_normal)?;
        let duration = clock.elapsed(&started);

        // `trace` succeeded, so the texture is present.
        let (texture_width, texture_height, span) =
            surface.tracer_image().map_or((0, 0, 0), |image| {
                let span = image
                    .uv_to_texel(start_uv)
                    .col
                    .abs_diff(image.uv_to_texel(end_uv).col);
                (image.width(), image.height(), span)
            });

        let diagnostics = TraceDiagnostics {
            duration,
            texture_width,
            texture_height,
            direction: trace.direction,
            span,
            stride: self.stride,
            samples: trace.texels.len(),
            emitted: trace.world.len(),
            dropped: trace.dropped,
        };
        Ok((trace, diagnostics))
    }

    /// Walk the columns from `from` to `to`, picking one row per sample.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation
    )]
    fn scan(
        &self,
        image: &TracerImage,
        direction: ScanDirection,
        from: Texel,
        to: Texel,
    ) -> Vec<Texel> {
        let span = from.col.abs_diff(to.col);
        let count = span / self.stride + 1;
        let half = i64::from(self.config.window_half_height);
        let last_row = i64::from(image.height()) - 1;
        let seed = Seed::read(image, from);
        let mut current_row = i64::from(from.row);

        (0..count)
            .map(|k| {
                let offset = k * self.stride;
                let col = match direction {
                    ScanDirection::DecreasingColumn => from.col - offset,
                    ScanDirection::IncreasingColumn => from.col + offset,
                };
                let progress = if span == 0 {
                    0.0
                } else {
                    offset as f32 / span as f32
                };
                // The window is centred between the row picked in the
                // previous column and the end row.
                let target = lerp(current_row as f32, to.row as f32, progress) as i64;

                current_row = (target - half..=target + half)
                    .filter(|row| (0..=last_row).contains(row))
                    .min_by_key(|&row| seed.score(image, col, row))
                    .unwrap_or_else(|| target.clamp(0, last_row));

                Texel::new(col, u32::try_from(current_row).unwrap_or(0))
            })
            .collect()
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (b - a).mul_add(t, a)
}
