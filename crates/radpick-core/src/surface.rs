//! The radargram surface handle a picking session binds to.
//!
//! Surfaces are owned by the host scene and handed to the session inside
//! every pointer hit as an `Arc`, so the session never looks anything up
//! by name. Mesh and texture are shared immutably; the tracer-space
//! mirror of the texture is built lazily and cached for the surface's
//! lifetime.

use std::sync::{Arc, OnceLock};

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;
use crate::texture::{Texture, TracerImage};

/// Stable identifier of a radargram surface within the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Per-surface orientation metadata.
///
/// Flightlines flown in the opposite direction store their radargram
/// reversed; `backwards` flips the tracer's scan direction for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceOrientation {
    /// The radargram runs against the surface's forward axis.
    pub backwards: bool,
}

/// A textured flightline mesh that can be picked on.
#[derive(Debug)]
pub struct RadargramSurface {
    id: SurfaceId,
    name: String,
    transform: Affine3A,
    mesh: Option<Arc<Mesh>>,
    texture: Option<Arc<Texture>>,
    orientation: Option<SurfaceOrientation>,
    pickable: bool,
    tracer_image: OnceLock<TracerImage>,
}

impl RadargramSurface {
    /// A pickable surface with an identity transform and no assets.
    #[must_use]
    pub fn new(id: SurfaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            transform: Affine3A::IDENTITY,
            mesh: None,
            texture: None,
            orientation: None,
            pickable: true,
            tracer_image: OnceLock::new(),
        }
    }

    /// Set the local-to-world transform.
    #[must_use]
    pub const fn with_transform(mut self, transform: Affine3A) -> Self {
        self.transform = transform;
        self
    }

    /// Attach the triangulated mesh.
    #[must_use]
    pub fn with_mesh(mut self, mesh: Arc<Mesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Bind the radargram texture.
    #[must_use]
    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture = Some(texture);
        self.tracer_image = OnceLock::new();
        self
    }

    /// Attach orientation metadata.
    #[must_use]
    pub const fn with_orientation(mut self, orientation: SurfaceOrientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Mark the surface as (not) accepting picks.
    #[must_use]
    pub const fn with_pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable;
        self
    }

    /// Stable identifier; strokes stay on one id.
    #[must_use]
    pub const fn id(&self) -> SurfaceId {
        self.id
    }

    /// Display name, used in logs and debug file names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local-to-world transform of the mesh.
    #[must_use]
    pub const fn transform(&self) -> &Affine3A {
        &self.transform
    }

    /// The flightline mesh, if one is bound.
    #[must_use]
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_deref()
    }

    /// The radargram texture, if one is bound.
    #[must_use]
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_deref()
    }

    /// Digitising direction metadata, if known.
    #[must_use]
    pub const fn orientation(&self) -> Option<SurfaceOrientation> {
        self.orientation
    }

    /// Whether picks on this surface are accepted.
    #[must_use]
    pub const fn is_pickable(&self) -> bool {
        self.pickable
    }

    /// The tracer-space mirror of the bound texture, built on first use.
    #[must_use]
    pub fn tracer_image(&self) -> Option<&TracerImage> {
        let texture = self.texture.as_deref()?;
        Some(self.tracer_image.get_or_init(|| {
            log::debug!(
                "{}: mirroring {}x{} texture into tracer space",
                self.name,
                texture.width(),
                texture.height()
            );
            texture.to_tracer_image()
        }))
    }
}

/// A raycast hit on a radargram surface, as reported by the pointer.
#[derive(Debug, Clone)]
pub struct PointerHit {
    /// World-space hit point.
    pub point: Vec3,
    /// World-space surface normal at the hit.
    pub normal: Vec3,
    /// The surface that was hit.
    pub surface: Arc<RadargramSurface>,
}
