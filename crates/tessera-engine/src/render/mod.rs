//! Scene compilation and frame submission.
//!
//! [`Renderer`] turns a [`Scene`](crate::scene::Scene) into GPU resources and one render
//! pass per frame. Pipeline state derivation lives in [`pipeline`], culling and draw
//! ordering in [`visibility`].

mod config;
mod error;
pub mod pipeline;
mod renderer;
pub mod visibility;

pub use config::RendererConfig;
pub use error::RenderError;
pub use pipeline::PipelineState;
pub use renderer::Renderer;
pub use visibility::{DrawKey, RenderItem};
