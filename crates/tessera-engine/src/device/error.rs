use thiserror::Error;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Failures reported by a [`GpuDevice`](super::GpuDevice).
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    AdapterUnavailable(String),

    #[error("failed to create GPU device: {0}")]
    DeviceUnavailable(String),

    #[error("failed to create surface: {0}")]
    SurfaceCreation(String),

    #[error("surface frame unavailable ({action:?}): {source}")]
    Surface {
        action: SurfaceErrorAction,
        #[source]
        source: wgpu::SurfaceError,
    },

    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },

    #[error("unknown {0} handle")]
    InvalidHandle(&'static str),
}

impl GpuError {
    pub(crate) fn creation(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::ResourceCreation {
            resource,
            reason: reason.into(),
        }
    }

    /// Surface recovery hint, when this error came from frame acquisition.
    pub fn surface_action(&self) -> Option<SurfaceErrorAction> {
        match self {
            Self::Surface { action, .. } => Some(*action),
            _ => None,
        }
    }
}
