use glam::{Mat4, Vec3};

/// Bounding sphere in the local space of a geometry (or world space once transformed).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Computes a sphere around interleaved-free position data.
    ///
    /// The center is the midpoint of the axis-aligned bounds; the radius is the largest
    /// distance from that center. Components past the third are ignored, missing ones
    /// read as zero. Returns `None` for empty input.
    pub fn from_positions(data: &[f32], item_size: usize) -> Option<Self> {
        if item_size == 0 || data.len() < item_size {
            return None;
        }

        let point = |chunk: &[f32]| {
            Vec3::new(
                chunk[0],
                chunk.get(1).copied().unwrap_or(0.0),
                chunk.get(2).copied().unwrap_or(0.0),
            )
        };

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for chunk in data.chunks_exact(item_size) {
            let p = point(chunk);
            min = min.min(p);
            max = max.max(p);
        }

        let center = (min + max) * 0.5;
        let radius_sq = data
            .chunks_exact(item_size)
            .map(|chunk| center.distance_squared(point(chunk)))
            .fold(0.0f32, f32::max);

        Some(Self::new(center, radius_sq.sqrt()))
    }

    /// Returns this sphere moved into the space described by `matrix`.
    ///
    /// Non-uniform scale inflates the radius by the largest axis scale.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point3(self.center);
        let max_scale = matrix
            .x_axis
            .truncate()
            .length()
            .max(matrix.y_axis.truncate().length())
            .max(matrix.z_axis.truncate().length());
        Self::new(center, self.radius * max_scale)
    }
}
