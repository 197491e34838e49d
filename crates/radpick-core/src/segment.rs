//! Segment generation: materialize the path between two committed points.
//!
//! This module defines the [`SegmentGenerator`] trait for pluggable
//! segment strategies and the [`SegmentStrategy`] enum for runtime
//! selection. The picking session switches strategy while a stroke is in
//! progress, so the choice is made per segment, not per session.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::sampler::{SampleError, UniformSampler};
use crate::surface::RadargramSurface;
use crate::tracer::{HorizonTrace, HorizonTracer, TraceError};

/// Errors that prevent a segment from being generated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SegmentError {
    /// The guided tracer could not run.
    #[error("guided trace failed: {0}")]
    Trace(#[from] TraceError),

    /// The unguided sampler could not run.
    #[error("unguided sampling failed: {0}")]
    Sample(#[from] SampleError),
}

/// Selects how the path between two committed points is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SegmentStrategy {
    /// Follow the reflection in the radargram with the horizon tracer.
    #[default]
    Guided,

    /// Straight line in UV space, evenly resampled onto the mesh.
    Unguided,
}

impl SegmentStrategy {
    /// The other strategy.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Guided => Self::Unguided,
            Self::Unguided => Self::Guided,
        }
    }
}

/// Endpoints of one segment on a surface.
///
/// `start_*` is where the previous segment ended (or the previous
/// committed point when there is none); `end_*` is the newly committed
/// point.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRequest<'a> {
    /// Surface the segment lies on.
    pub surface: &'a RadargramSurface,
    /// World-space start.
    pub start_world: Vec3,
    /// UV of the start.
    pub start_uv: Vec2,
    /// World-space end.
    pub end_world: Vec3,
    /// UV of the end.
    pub end_uv: Vec2,
    /// Surface normal at the starting pick.
    pub hit_normal: Vec3,
}

/// A generated segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// World-space path, ordered from the request's start to its end.
    pub points: Vec<Vec3>,
    /// The underlying trace, for guided segments.
    pub trace: Option<HorizonTrace>,
}

/// Trait for segment strategies.
pub trait SegmentGenerator {
    /// Produce the path for `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`SegmentError`] when the surface lacks the assets the
    /// strategy needs or the configuration is unusable.
    fn generate(
        &self,
        request: &SegmentRequest<'_>,
        config: &SessionConfig,
    ) -> Result<Segment, SegmentError>;
}

impl SegmentGenerator for SegmentStrategy {
    fn generate(
        &self,
        request: &SegmentRequest<'_>,
        config: &SessionConfig,
    ) -> Result<Segment, SegmentError> {
        match *self {
            Self::Guided => generate_guided(request, config),
            Self::Unguided => generate_unguided(request, config),
        }
    }
}

/// Trace the horizon and orient the result from start to end.
///
/// The tracer scans in whichever direction the hit side dictates, so its
/// output runs end-to-start about half the time.
fn generate_guided(
    request: &SegmentRequest<'_>,
    config: &SessionConfig,
) -> Result<Segment, SegmentError> {
    let tracer = HorizonTracer::new(config.tracer, config.guided_stride);
    let trace = tracer.trace(
        request.surface,
        request.start_uv,
        request.end_uv,
        request.hit_normal,
    )?;

    let start_col = request
        .surface
        .tracer_image()
        .map(|image| image.uv_to_texel(request.start_uv).col);
    let mut points = trace.world.clone();
    if trace.scan_start().map(|t| t.col) != start_col {
        points.reverse();
    }

    Ok(Segment {
        points,
        trace: Some(trace),
    })
}

fn generate_unguided(
    request: &SegmentRequest<'_>,
    config: &SessionConfig,
) -> Result<Segment, SegmentError> {
    let mesh = request.surface.mesh().ok_or(SampleError::MissingMesh)?;
    let sampler = UniformSampler::new(config.unguided_interval)?;
    let points = sampler.sample(
        request.start_world,
        request.end_world,
        mesh,
        request.surface.transform(),
    )?;
    Ok(Segment {
        points,
        trace: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use image::{GrayImage, Luma};

    use super::*;
    use crate::mapping;
    use crate::mesh::Mesh;
    use crate::surface::{SurfaceId, SurfaceOrientation};
    use crate::texture::Texture;

    fn surface() -> RadargramSurface {
        let image = GrayImage::from_fn(100, 50, |_, y| Luma([if y == 25 { 220 } else { 30 }]));
        RadargramSurface::new(SurfaceId(1), "s")
            .with_mesh(Arc::new(Mesh::plane_grid(4, 2, Vec2::new(10.0, 5.0))))
            .with_texture(Arc::new(Texture::from_image(&image)))
            .with_orientation(SurfaceOrientation::default())
    }

    fn request(surface: &RadargramSurface, start_uv: Vec2, end_uv: Vec2, normal: Vec3) -> SegmentRequest<'_> {
        let world = |uv| mapping::uv_to_world(uv, surface.mesh().unwrap(), surface.transform()).unwrap();
        SegmentRequest {
            surface,
            start_world: world(start_uv),
            start_uv,
            end_world: world(end_uv),
            end_uv,
            hit_normal: normal,
        }
    }

    #[test]
    fn toggled_flips_strategy() {
        assert_eq!(SegmentStrategy::Guided.toggled(), SegmentStrategy::Unguided);
        assert_eq!(SegmentStrategy::Unguided.toggled(), SegmentStrategy::Guided);
        assert_eq!(SegmentStrategy::default(), SegmentStrategy::Guided);
    }

    #[test]
    fn guided_segment_runs_start_to_end_for_both_hit_sides() {
        let surface = surface();
        let start_uv = Vec2::new(0.105, 0.49);
        let end_uv = Vec2::new(0.805, 0.49);
        for normal in [Vec3::Z, Vec3::NEG_Z] {
            let segment = SegmentStrategy::Guided
                .generate(&request(&surface, start_uv, end_uv, normal), &SessionConfig::default())
                .unwrap();
            let first = segment.points.first().unwrap();
            let last = segment.points.last().unwrap();
            assert!(first.x < last.x, "normal {normal}: {first} .. {last}");
            assert!(segment.trace.is_some());
        }
    }

    #[test]
    fn unguided_segment_is_straight() {
        let surface = surface();
        let segment = SegmentStrategy::Unguided
            .generate(
                &request(&surface, Vec2::new(0.1, 0.2), Vec2::new(0.9, 0.6), Vec3::Z),
                &SessionConfig {
                    unguided_interval: 1.0,
                    ..SessionConfig::default()
                },
            )
            .unwrap();
        assert!(segment.trace.is_none());
        assert!(segment.points.len() >= 9);
        let first = *segment.points.first().unwrap();
        let last = *segment.points.last().unwrap();
        let dir = (last - first).normalize();
        for p in &segment.points {
            let along = (*p - first).dot(dir);
            assert!((first + dir * along).distance(*p) < 1e-4);
        }
    }

    #[test]
    fn missing_assets_surface_as_segment_errors() {
        let bare = RadargramSurface::new(SurfaceId(2), "bare");
        let req = SegmentRequest {
            surface: &bare,
            start_world: Vec3::ZERO,
            start_uv: Vec2::ZERO,
            end_world: Vec3::X,
            end_uv: Vec2::X,
            hit_normal: Vec3::Z,
        };
        let config = SessionConfig::default();
        assert_eq!(
            SegmentStrategy::Guided.generate(&req, &config),
            Err(SegmentError::Trace(TraceError::MissingTexture))
        );
        assert_eq!(
            SegmentStrategy::Unguided.generate(&req, &config),
            Err(SegmentError::Sample(SampleError::MissingMesh))
        );
    }

    #[test]
    fn error_display_wraps_source() {
        let err = SegmentError::from(TraceError::MissingOrientation);
        assert_eq!(err.to_string(), "guided trace failed: surface has no orientation metadata");
    }
}
