//! Math helpers not covered by `glam`.
//!
//! Vectors, matrices and quaternions come straight from `glam`; this module adds the
//! culling primitives the visibility pass needs.

mod bounds;
mod frustum;

pub use bounds::BoundingSphere;
pub use frustum::{Frustum, Plane};

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
