use glam::{Mat4, Vec3};

use crate::math::Frustum;

use super::Transform;

/// Camera projection parameters. Angles in radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    /// Right-handed projection with 0..1 clip depth.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Self::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective {
            fov_y: 60f32.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Viewpoint used for projection, sorting and culling.
///
/// Call [`update_matrices`](Self::update_matrices) after editing the transform or
/// projection; the renderer does so itself when rendering with a camera.
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection: Projection,
    pub transform: Transform,
    pub matrix_auto_update: bool,

    world_matrix: Mat4,
    projection_matrix: Mat4,
    view_matrix: Mat4,
    view_projection: Mat4,
    frustum: Frustum,
}

impl Camera {
    pub fn new(projection: Projection) -> Self {
        let mut camera = Self {
            projection,
            transform: Transform::IDENTITY,
            matrix_auto_update: true,
            world_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        camera.update_matrices();
        camera
    }

    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Perspective {
            fov_y,
            aspect,
            near,
            far,
        })
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        })
    }

    /// Moves the camera to `eye` facing `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.transform = Transform::looking_at(eye, target, up);
        self.update_matrices();
    }

    /// Updates the perspective aspect ratio; orthographic projections are left alone.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = &mut self.projection {
            *a = aspect;
        }
        self.update_matrices();
    }

    /// Overrides the camera's world matrix; only meaningful with `matrix_auto_update` off.
    pub fn set_world_matrix(&mut self, world: Mat4) {
        self.world_matrix = world;
    }

    /// Recomputes projection, view and frustum from the current state.
    pub fn update_matrices(&mut self) {
        if self.matrix_auto_update {
            self.world_matrix = self.transform.matrix();
        }
        self.projection_matrix = self.projection.matrix();
        self.view_matrix = self.world_matrix.inverse();
        self.view_projection = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(&self.view_projection);
    }

    #[inline]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    #[inline]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Projection::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::BoundingSphere;

    fn camera_at_z5() -> Camera {
        let mut cam = Camera::perspective(60f32.to_radians(), 1.0, 0.1, 100.0);
        cam.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        cam
    }

    #[test]
    fn view_matrix_inverts_world() {
        let cam = camera_at_z5();
        let origin_in_view = cam.view_matrix().transform_point3(Vec3::ZERO);
        assert!((origin_in_view - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn frustum_follows_camera() {
        let cam = camera_at_z5();
        assert!(cam.frustum().intersects_sphere(&BoundingSphere::new(Vec3::ZERO, 0.5)));
        let behind = BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 0.5);
        assert!(!cam.frustum().intersects_sphere(&behind));
    }

    #[test]
    fn aspect_only_touches_perspective() {
        let mut cam = Camera::orthographic(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
        let before = cam.projection;
        cam.set_aspect(2.0);
        assert_eq!(cam.projection, before);

        let mut cam = camera_at_z5();
        cam.set_aspect(2.0);
        assert!(matches!(cam.projection, Projection::Perspective { aspect, .. } if aspect == 2.0));
    }
}
