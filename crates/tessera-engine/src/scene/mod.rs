//! Scene data: the node tree and the CPU-side objects the renderer compiles.
//!
//! Every identity-bearing type gets an [`ObjectId`] at construction and is deliberately
//! not `Clone`; caches key on that id.

mod camera;
mod geometry;
mod id;
mod material;
mod mesh;
mod node;
mod render_target;
mod texture;

pub use camera::{Camera, Projection};
pub use geometry::{Attribute, AttributeData, AttributeKind, Geometry, POSITION};
pub use id::{ObjectId, Shared, shared};
pub use material::{Blending, Material, Side};
pub use mesh::{DrawMode, Mesh};
pub use node::{Node, Scene, Transform, Visit};
pub use render_target::RenderTarget;
pub use texture::{Texture, TextureSource};
