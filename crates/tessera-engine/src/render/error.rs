use thiserror::Error;

use crate::device::{GpuError, SurfaceErrorAction};
use crate::scene::{AttributeKind, ObjectId};

/// Failures while compiling or rendering a scene.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("attribute `{name}` has no vertex format for {kind:?} x {item_size}")]
    UnsupportedAttribute {
        name: String,
        kind: AttributeKind,
        item_size: u32,
    },

    #[error("geometry has neither an index nor a `position` attribute")]
    MissingPosition,

    #[error("material {material}: uniform block member `{name}` has no value")]
    MissingUniform { material: ObjectId, name: String },
}

impl RenderError {
    /// Recovery hint when the frame failed at surface acquisition.
    pub fn surface_action(&self) -> Option<SurfaceErrorAction> {
        match self {
            Self::Gpu(e) => e.surface_action(),
            _ => None,
        }
    }
}
