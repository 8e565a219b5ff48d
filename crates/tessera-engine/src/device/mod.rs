//! GPU capability layer.
//!
//! The renderer only talks to a [`GpuDevice`]: an opaque-handle interface over resource
//! creation, uploads and a single-pass frame submission.
//! - [`WgpuDevice`] owns the wgpu Instance/Adapter/Device/Queue and a window surface
//! - [`HeadlessDevice`] needs no GPU; it counts and records every call

mod error;
mod headless;
mod init;
mod surface;
mod types;
mod wgpu_device;

pub use error::{GpuError, SurfaceErrorAction};
pub use headless::{DeviceStats, HeadlessDevice};
pub use init::GpuInit;
pub use types::{
    BindGroupDesc, BindGroupHandle, BindingResource, BufferDesc, BufferHandle, ColorTarget,
    DepthState, FrameCommands, LoadAction, PassDesc, PipelineDesc, PipelineHandle,
    RenderCommand, SamplerDesc, SamplerHandle, TextureDesc, TextureHandle, TextureViewHandle,
    VertexBufferDesc,
};
pub use wgpu_device::WgpuDevice;

/// Graphics capability consumed by the renderer.
///
/// Handles are only meaningful to the device that issued them. Destroying an unknown
/// handle is a no-op; using one in a write or a bind group is an error.
pub trait GpuDevice {
    /// Format of the presentable surface.
    fn surface_format(&self) -> wgpu::TextureFormat;

    /// Current drawable size in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Reconfigures the surface after a resize.
    fn resize(&mut self, width: u32, height: u32);

    /// Acquires the next surface frame. The view becomes invalid after the next submit.
    fn acquire_surface_view(&mut self) -> Result<TextureViewHandle, GpuError>;

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError>;

    /// Replaces the buffer's contents from offset 0.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), GpuError>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, GpuError>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn create_texture_view(&mut self, texture: TextureHandle)
    -> Result<TextureViewHandle, GpuError>;

    fn destroy_texture_view(&mut self, view: TextureViewHandle);

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuError>;

    fn destroy_sampler(&mut self, sampler: SamplerHandle);

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineHandle, GpuError>;

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle);

    /// Creates a bind group against the layout the pipeline reflected for `desc.group`.
    fn create_bind_group(
        &mut self,
        pipeline: PipelineHandle,
        desc: &BindGroupDesc<'_>,
    ) -> Result<BindGroupHandle, GpuError>;

    fn destroy_bind_group(&mut self, group: BindGroupHandle);

    /// Encodes `frame` into one render pass and submits it to the queue; presents the
    /// surface frame if one was acquired.
    fn submit(&mut self, frame: FrameCommands) -> Result<(), GpuError>;
}

/// Pads `bytes` with zeros to the 4-byte multiple wgpu requires for buffer sizes and
/// writes (minimum 4 bytes).
pub(crate) fn pad_to_copy_alignment(bytes: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let padded = bytes.len().max(4).next_multiple_of(4);
    if padded == bytes.len() {
        std::borrow::Cow::Borrowed(bytes)
    } else {
        let mut out = bytes.to_vec();
        out.resize(padded, 0);
        std::borrow::Cow::Owned(out)
    }
}

/// Rejects zero-sized textures and initial data shorter than `width * height` texels.
pub(crate) fn validate_texture(desc: &TextureDesc<'_>) -> Result<(), GpuError> {
    if desc.width == 0 || desc.height == 0 {
        return Err(GpuError::creation("texture", "zero-sized texture"));
    }
    if let Some(data) = desc.data {
        let texel = desc.format.block_copy_size(None).unwrap_or(4) as usize;
        let needed = desc.width as usize * desc.height as usize * texel;
        if data.len() < needed {
            return Err(GpuError::creation(
                "texture",
                format!("{} bytes of pixel data, {needed} needed", data.len()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32, data: Option<&[u8]>) -> TextureDesc<'_> {
        TextureDesc {
            label: None,
            width,
            height,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            data,
        }
    }

    #[test]
    fn short_pixel_data_is_rejected() {
        assert!(validate_texture(&rgba(2, 2, Some(&[0; 16]))).is_ok());
        assert!(validate_texture(&rgba(2, 2, Some(&[0; 15]))).is_err());
        assert!(validate_texture(&rgba(0, 2, None)).is_err());
        assert!(validate_texture(&rgba(2, 2, None)).is_ok());
    }

    #[test]
    fn padding_rounds_to_four() {
        assert_eq!(pad_to_copy_alignment(&[]).len(), 4);
        assert_eq!(pad_to_copy_alignment(&[1, 2, 3, 4, 5, 6]).len(), 8);
        assert!(matches!(
            pad_to_copy_alignment(&[0; 8]),
            std::borrow::Cow::Borrowed(_)
        ));
    }
}
