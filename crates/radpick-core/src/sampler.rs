//! Unguided segments: evenly spaced samples on a straight UV line.
//!
//! Both world endpoints are mapped to UV, the UV segment between them is
//! sampled at a fixed world-distance interval, and every sample is mapped
//! back onto the mesh. Nothing about the image is consulted, so on a
//! curved surface the result follows the surface, not the chord.

use glam::{Affine3A, Vec2, Vec3};

use crate::mapping;
use crate::mesh::Mesh;

/// Errors raised by [`UniformSampler::sample`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    /// The surface has no mesh to sample on.
    #[error("surface has no mesh")]
    MissingMesh,

    /// The sampling interval is not a positive finite number.
    #[error("sampling interval must be positive and finite, got {0}")]
    InvalidInterval(f32),

    /// An endpoint could not be placed on the mesh at all.
    #[error("segment endpoint {0} could not be mapped onto the mesh")]
    EndpointOffSurface(Vec3),
}

/// Straight-line UV sampler with a fixed spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSampler {
    interval: f32,
}

impl UniformSampler {
    /// A sampler placing points roughly every `interval` world units.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::InvalidInterval`] unless `interval` is
    /// positive and finite.
    pub fn new(interval: f32) -> Result<Self, SampleError> {
        if interval.is_finite() && interval > 0.0 {
            Ok(Self { interval })
        } else {
            Err(SampleError::InvalidInterval(interval))
        }
    }

    /// Target distance between samples, in world units.
    #[must_use]
    pub const fn interval(&self) -> f32 {
        self.interval
    }

    /// Number of samples for a segment of length `distance`, endpoints
    /// included. Never less than two.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn sample_count(&self, distance: f32) -> usize {
        let steps = (distance / self.interval).ceil();
        if steps.is_finite() && steps > 0.0 {
            (steps as usize + 1).max(2)
        } else {
            2
        }
    }

    /// Sample the surface between two world points.
    ///
    /// Endpoints that lie slightly off the mesh (seams, hits from a
    /// simplified collider) fall back to the nearest-triangle estimate.
    /// Samples that map off the mesh are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::EndpointOffSurface`] if an endpoint cannot
    /// be placed on the mesh even approximately.
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(
        &self,
        start: Vec3,
        end: Vec3,
        mesh: &Mesh,
        transform: &Affine3A,
    ) -> Result<Vec<Vec3>, SampleError> {
        let start_uv = endpoint_uv(start, mesh, transform)?;
        let end_uv = endpoint_uv(end, mesh, transform)?;

        let count = self.sample_count(start.distance(end));
        let last = (count - 1) as f32;
        let points: Vec<Vec3> = (0..count)
            .filter_map(|i| {
                let uv = start_uv.lerp(end_uv, i as f32 / last);
                mapping::uv_to_world(uv, mesh, transform)
            })
            .collect();

        if points.len() < count {
            log::debug!(
                "unguided segment: {} of {count} samples fell off the mesh",
                count - points.len()
            );
        }
        Ok(points)
    }
}

fn endpoint_uv(world: Vec3, mesh: &Mesh, transform: &Affine3A) -> Result<Vec2, SampleError> {
    mapping::world_to_uv(world, mesh, transform)
        .or_else(|| mapping::approximate_uv_from_hit(world, mesh, transform))
        .ok_or(SampleError::EndpointOffSurface(world))
}
