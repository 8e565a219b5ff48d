use glam::{Mat4, Vec3, Vec4};

use super::BoundingSphere;

/// Plane in Hessian normal form: `normal · p + constant = 0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub constant: f32,
}

impl Plane {
    /// Builds a normalized plane from `(a, b, c, d)` coefficients.
    fn from_coefficients(v: Vec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self {
                normal: normal / len,
                constant: v.w / len,
            }
        } else {
            Self {
                normal,
                constant: v.w,
            }
        }
    }

    /// Signed distance from `point`; positive on the side the normal points to.
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }
}

/// View frustum as six inward-facing planes.
///
/// Order: left, right, bottom, top, near, far.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of a projection × view matrix.
    ///
    /// Clip-space depth is expected in `[0, 1]` (WebGPU/wgpu convention), which is what
    /// `glam`'s `*_rh` projection constructors produce.
    pub fn from_matrix(m: &Mat4) -> Self {
        let r0 = m.row(0);
        let r1 = m.row(1);
        let r2 = m.row(2);
        let r3 = m.row(3);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Returns `true` if any part of the sphere lies inside all six planes.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }

    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::from_matrix(&Mat4::IDENTITY)
    }
}
