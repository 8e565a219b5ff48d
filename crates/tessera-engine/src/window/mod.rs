//! `winit` event loop owning the window and its renderer.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
