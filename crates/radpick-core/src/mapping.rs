//! Mapping between UV space and world space through a triangulated mesh.
//!
//! All three queries are linear scans over the mesh's triangles. That is
//! fine for radargram strips: the mappers are called once per traced
//! sample, never per frame, and a segment has at most a few hundred
//! samples.
//!
//! "No containing triangle" is reported as `None`. A legitimate result of
//! `(0, 0)` or `(0, 0, 0)` is never ambiguous with failure.

use glam::{Affine3A, Vec2, Vec3};

use crate::geometry::{self, DEGENERATE_AREA};
use crate::mesh::Mesh;

/// Slack on barycentric weights so points on shared edges are not lost
/// to rounding.
pub const BARYCENTRIC_TOLERANCE: f32 = 1e-6;

/// Map a UV coordinate to a world-space point on the mesh.
///
/// Scans triangles in index order, skipping those with zero UV area. The
/// first triangle whose UV-space barycentric weights are all
/// non-negative interpolates its local positions, which are then moved
/// to world space by `transform`.
///
/// Returns `None` if no triangle contains `uv`.
#[must_use]
pub fn uv_to_world(uv: Vec2, mesh: &Mesh, transform: &Affine3A) -> Option<Vec3> {
    mesh.triangles().find_map(|triangle| {
        let [u1, u2, u3] = triangle.uvs;
        let area = triangle.uv_area();
        if area.abs() <= DEGENERATE_AREA {
            return None;
        }

        let weights = Vec3::new(
            geometry::triangle_area_2d(u2, u3, uv) / area,
            geometry::triangle_area_2d(u3, u1, uv) / area,
            geometry::triangle_area_2d(u1, u2, uv) / area,
        );
        if weights.min_element() < -BARYCENTRIC_TOLERANCE {
            return None;
        }

        Some(transform.transform_point3(triangle.interpolate_position(weights)))
    })
}

/// Map a world-space point to a UV coordinate on the mesh.
///
/// The point is moved into the mesh's local space and tested against
/// every non-degenerate triangle; a triangle matches when all three
/// barycentric weights of the point (projected onto its plane) lie in
/// `[-ε, 1 + ε]`.
///
/// This is not a first-match search. When several triangles match, the
/// one whose plane is closest to the point wins. A point on a curved or
/// folded mesh can project inside a triangle on a distant fold, and first
/// match would return that triangle's UV. Ties keep the earliest
/// triangle, so on a planar mesh the result equals the first containing
/// triangle.
///
/// Returns `None` if no triangle contains the point.
#[must_use]
pub fn world_to_uv(world: Vec3, mesh: &Mesh, transform: &Affine3A) -> Option<Vec2> {
    let local = transform.inverse().transform_point3(world);

    let mut best: Option<(f32, Vec2)> = None;
    for triangle in mesh.triangles() {
        if triangle.area() <= DEGENERATE_AREA {
            continue;
        }

        let [a, b, c] = triangle.positions;
        let Some(weights) = geometry::barycentric_3d(local, a, b, c) else {
            continue;
        };
        let in_range = |w: f32| (-BARYCENTRIC_TOLERANCE..=1.0 + BARYCENTRIC_TOLERANCE).contains(&w);
        if !(in_range(weights.x) && in_range(weights.y) && in_range(weights.z)) {
            continue;
        }

        let normal = (b - a).cross(c - a).normalize_or_zero();
        let plane_distance = (local - a).dot(normal).abs();
        if best.is_none_or(|(distance, _)| plane_distance < distance) {
            best = Some((plane_distance, triangle.interpolate_uv(weights)));
        }
    }

    best.map(|(_, uv)| uv)
}

/// Approximate the UV coordinate under a raycast hit.
///
/// Hits on curved or simplified meshes rarely lie exactly on a triangle,
/// so instead of a containment test this finds the triangle whose
/// closest point is nearest to the hit and interpolates its UVs with the
/// hit's barycentric coordinates.
///
/// Returns `None` only when the mesh has no non-degenerate triangle.
#[must_use]
pub fn approximate_uv_from_hit(hit: Vec3, mesh: &Mesh, transform: &Affine3A) -> Option<Vec2> {
    let local = transform.inverse().transform_point3(hit);

    let nearest = mesh
        .triangles()
        .filter(|triangle| triangle.area() > DEGENERATE_AREA)
        .map(|triangle| {
            let [a, b, c] = triangle.positions;
            let closest = geometry::closest_point_on_triangle(local, a, b, c);
            (local.distance_squared(closest), triangle)
        })
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, triangle)| triangle);

    let Some(triangle) = nearest else {
        log::error!("approximate_uv_from_hit: mesh has no usable triangles");
        return None;
    };

    let [a, b, c] = triangle.positions;
    geometry::barycentric_3d(local, a, b, c).map(|weights| triangle.interpolate_uv(weights))
}
