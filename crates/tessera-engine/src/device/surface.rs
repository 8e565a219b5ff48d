use super::{GpuError, SurfaceErrorAction};

/// sRGB first when asked for, otherwise the surface's own preference.
pub(crate) fn pick_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    const SRGB: [wgpu::TextureFormat; 2] = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    let srgb = prefer_srgb
        .then(|| SRGB.into_iter().find(|f| caps.formats.contains(f)))
        .flatten();
    srgb.or_else(|| caps.formats.first().copied())
}

pub(crate) fn pick_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// How an acquisition failure is handled.
pub(crate) fn recovery(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Window surface plus the configuration it was last given.
///
/// A zero extent is remembered but never configured; wgpu rejects empty surfaces.
pub(crate) struct SurfaceState<'w> {
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
    size: (u32, u32),
}

impl<'w> SurfaceState<'w> {
    pub fn new(
        surface: wgpu::Surface<'w>,
        config: wgpu::SurfaceConfiguration,
        size: (u32, u32),
        device: &wgpu::Device,
    ) -> Self {
        let state = Self {
            surface,
            config,
            size,
        };
        state.configure(device);
        state
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn configure(&self, device: &wgpu::Device) {
        if self.size.0 > 0 && self.size.1 > 0 {
            self.surface.configure(device, &self.config);
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: (u32, u32)) {
        self.size = size;
        if size.0 > 0 && size.1 > 0 {
            self.config.width = size.0;
            self.config.height = size.1;
        }
        self.configure(device);
    }

    /// Next frame's texture. Lost and outdated surfaces are reconfigured before the
    /// error is returned, so the following frame can succeed.
    pub fn acquire(&self, device: &wgpu::Device) -> Result<wgpu::SurfaceTexture, GpuError> {
        self.surface.get_current_texture().map_err(|source| {
            let action = recovery(&source);
            if action == SurfaceErrorAction::Reconfigured {
                self.configure(device);
            }
            GpuError::Surface { action, source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: &[wgpu::TextureFormat]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    #[test]
    fn srgb_preference_falls_back_to_first_format() {
        use wgpu::TextureFormat as F;
        let c = caps(&[F::Bgra8Unorm, F::Rgba8UnormSrgb]);
        assert_eq!(pick_format(&c, true), Some(F::Rgba8UnormSrgb));
        assert_eq!(pick_format(&c, false), Some(F::Bgra8Unorm));
        assert_eq!(pick_format(&caps(&[]), true), None);
    }

    #[test]
    fn unsupported_alpha_mode_is_replaced() {
        let c = caps(&[wgpu::TextureFormat::Bgra8Unorm]);
        assert_eq!(
            pick_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }

    #[test]
    fn only_out_of_memory_is_fatal() {
        assert_eq!(recovery(&wgpu::SurfaceError::Outdated), SurfaceErrorAction::Reconfigured);
        assert_eq!(recovery(&wgpu::SurfaceError::Timeout), SurfaceErrorAction::SkipFrame);
        assert_eq!(recovery(&wgpu::SurfaceError::OutOfMemory), SurfaceErrorAction::Fatal);
    }
}
