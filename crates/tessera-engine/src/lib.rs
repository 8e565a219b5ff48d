//! Tessera engine crate.
//!
//! A scene graph of meshes is compiled into GPU resources, culled and ordered, and
//! drawn in a single render pass per frame. [`render::Renderer`] is the entry point;
//! [`window::Runtime`] drives it from a `winit` window.

pub mod cache;
pub mod core;
pub mod device;
pub mod logging;
pub mod math;
pub mod render;
pub mod scene;
pub mod time;
pub mod uniforms;
pub mod window;
