//! Triangle primitives shared by the coordinate mappers.
//!
//! Everything here is pure arithmetic on [`glam`] vectors. Degenerate
//! input never panics: [`barycentric_3d`] reports it as `None` and the
//! area helpers let callers test against [`DEGENERATE_AREA`].

use glam::{Vec2, Vec3};

/// Triangles whose (UV or 3D) area magnitude is at or below this value
/// are treated as zero-area and never selected by a mapper.
pub const DEGENERATE_AREA: f32 = 1e-12;

/// Denominators below this magnitude make [`barycentric_3d`] give up.
pub const BARYCENTRIC_DENOMINATOR_EPSILON: f32 = 1e-6;

/// Signed area of the 2D triangle `(p1, p2, p3)`.
///
/// Positive for counter-clockwise winding. Ratios of these areas are the
/// barycentric weights used for point-in-triangle tests in UV space.
#[must_use]
pub fn triangle_area_2d(p1: Vec2, p2: Vec2, p3: Vec2) -> f32 {
    let v1 = p1 - p3;
    let v2 = p2 - p3;
    v1.perp_dot(v2) / 2.0
}

/// Unsigned area of the 3D triangle `(a, b, c)`.
#[must_use]
pub fn triangle_area_3d(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b - a).cross(c - a).length() / 2.0
}

/// Closest point to `p` on the solid triangle `(a, b, c)`.
///
/// Classifies `p` against the three vertex regions, the three edge
/// regions and the face region, in that order (Ericson, *Real-Time
/// Collision Detection*, 5.1.5).
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1.mul_add(d4, -(d3 * d2));
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5.mul_add(d2, -(d1 * d6));
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3.mul_add(d6, -(d5 * d4));
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Face region.
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Barycentric coordinates `(u, v, w)` of `p` with respect to `(a, b, c)`,
/// so that `p ≈ u·a + v·b + w·c` after projection onto the triangle's
/// plane.
///
/// Returns `None` for degenerate (zero-area or collinear) triangles and
/// logs a warning; callers skip the triangle.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn barycentric_3d(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denominator = d00.mul_add(d11, -(d01 * d01));
    if denominator.abs() < BARYCENTRIC_DENOMINATOR_EPSILON {
        log::warn!(
            "barycentric: near-zero denominator {denominator} for triangle {a} {b} {c} (point {p})"
        );
        return None;
    }

    let v = d11.mul_add(d20, -(d01 * d21)) / denominator;
    let w = d00.mul_add(d21, -(d01 * d20)) / denominator;
    let u = 1.0 - v - w;
    Some(Vec3::new(u, v, w))
}
