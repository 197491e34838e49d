//! Read-only triangle mesh with per-vertex UVs.
//!
//! A radargram surface is a triangulated strip whose vertices carry both
//! a 3D position (in the surface's local space) and a UV coordinate into
//! the bound radar image. The mesh is validated once at construction so
//! the mappers can index it without bounds checks failing at runtime.

use glam::{Vec2, Vec3};

use crate::geometry;

/// Errors raised when assembling a [`Mesh`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    /// The UV array is not parallel to the vertex array.
    #[error("mesh has {vertices} vertices but {uvs} UV coordinates")]
    UvCountMismatch {
        /// Number of vertex positions.
        vertices: usize,
        /// Number of UV coordinates.
        uvs: usize,
    },

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, but the mesh has {vertices} vertices")]
    IndexOutOfRange {
        /// Position of the offending triangle in the index list.
        triangle: usize,
        /// The out-of-range vertex index.
        index: u32,
        /// Number of vertex positions.
        vertices: usize,
    },
}

/// Immutable triangle mesh: positions, parallel UVs, and index triples.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<[u32; 3]>,
}

/// One triangle of a [`Mesh`], resolved to its corner data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Index of the triangle in the mesh's triangle list.
    pub index: usize,
    /// Local-space corner positions.
    pub positions: [Vec3; 3],
    /// UV coordinates of the corners.
    pub uvs: [Vec2; 3],
}

impl Triangle {
    /// Signed area of the triangle in UV space.
    #[must_use]
    pub fn uv_area(&self) -> f32 {
        geometry::triangle_area_2d(self.uvs[0], self.uvs[1], self.uvs[2])
    }

    /// Unsigned area of the triangle in local 3D space.
    #[must_use]
    pub fn area(&self) -> f32 {
        geometry::triangle_area_3d(self.positions[0], self.positions[1], self.positions[2])
    }

    /// Interpolate corner positions with barycentric weights.
    #[must_use]
    pub fn interpolate_position(&self, weights: Vec3) -> Vec3 {
        self.positions[0] * weights.x + self.positions[1] * weights.y + self.positions[2] * weights.z
    }

    /// Interpolate corner UVs with barycentric weights.
    #[must_use]
    pub fn interpolate_uv(&self, weights: Vec3) -> Vec2 {
        self.uvs[0] * weights.x + self.uvs[1] * weights.y + self.uvs[2] * weights.z
    }
}

impl Mesh {
    /// Build a mesh, checking that UVs are parallel to positions and that
    /// every triangle index is in range.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::UvCountMismatch`] if the arrays differ in
    /// length, or [`MeshError::IndexOutOfRange`] for a dangling index.
    pub fn new(
        positions: Vec<Vec3>,
        uvs: Vec<Vec2>,
        triangles: Vec<[u32; 3]>,
    ) -> Result<Self, MeshError> {
        if positions.len() != uvs.len() {
            return Err(MeshError::UvCountMismatch {
                vertices: positions.len(),
                uvs: uvs.len(),
            });
        }

        for (triangle, corners) in triangles.iter().enumerate() {
            if let Some(&index) = corners
                .iter()
                .find(|&&i| usize::try_from(i).map_or(true, |i| i >= positions.len()))
            {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    index,
                    vertices: positions.len(),
                });
            }
        }

        Ok(Self {
            positions,
            uvs,
            triangles,
        })
    }

    /// A flat rectangular grid in the local XY plane (z = 0).
    ///
    /// The grid spans `(0, 0)..size` with `columns × rows` quads, each
    /// split into two counter-clockwise triangles. UVs run linearly from
    /// `(0, 0)` at the origin to `(1, 1)` at `size`. Zero columns or rows
    /// are treated as one.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn plane_grid(columns: u32, rows: u32, size: Vec2) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let stride = columns + 1;

        let mut positions = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());
        for j in 0..=rows {
            for i in 0..=columns {
                let uv = Vec2::new(i as f32 / columns as f32, j as f32 / rows as f32);
                positions.push((uv * size).extend(0.0));
                uvs.push(uv);
            }
        }

        let mut triangles = Vec::with_capacity((columns * rows * 2) as usize);
        for j in 0..rows {
            for i in 0..columns {
                let a = j * stride + i;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                triangles.push([a, b, d]);
                triangles.push([a, d, c]);
            }
        }

        Self {
            positions,
            uvs,
            triangles,
        }
    }

    /// Local-space vertex positions.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Per-vertex UV coordinates.
    #[must_use]
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Triangle index triples.
    #[must_use]
    pub fn triangle_indices(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Number of triangles.
    #[must_use]
    pub const fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Iterate the triangles in index-list order with their corner data.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .map(|(index, &[i0, i1, i2])| {
                let (i0, i1, i2) = (i0 as usize, i1 as usize, i2 as usize);
                Triangle {
                    index,
                    positions: [self.positions[i0], self.positions[i1], self.positions[i2]],
                    uvs: [self.uvs[i0], self.uvs[i1], self.uvs[i2]],
                }
            })
    }
}
