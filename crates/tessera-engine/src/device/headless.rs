use std::collections::HashSet;

use super::types::*;
use super::{GpuDevice, GpuError, validate_texture};

/// Creation/upload counters of a [`HeadlessDevice`].
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct DeviceStats {
    pub buffers_created: usize,
    pub buffer_writes: usize,
    pub bytes_written: usize,
    pub textures_created: usize,
    pub views_created: usize,
    pub samplers_created: usize,
    pub pipelines_created: usize,
    pub bind_groups_created: usize,
    pub resources_destroyed: usize,
    pub submits: usize,
}

/// GPU-less [`GpuDevice`] that validates handles, counts calls and records frames.
///
/// Used by tests and dry runs. Pipelines with empty shader sources and zero-sized
/// textures fail the way a real device would.
#[derive(Debug)]
pub struct HeadlessDevice {
    format: wgpu::TextureFormat,
    size: (u32, u32),
    next_handle: u64,

    buffers: HashSet<u64>,
    textures: HashSet<u64>,
    views: HashSet<u64>,
    samplers: HashSet<u64>,
    pipelines: HashSet<u64>,
    bind_groups: HashSet<u64>,

    surface_view: Option<TextureViewHandle>,
    stats: DeviceStats,
    frames: Vec<FrameCommands>,
    labels: Vec<String>,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            size: (width, height),
            next_handle: 1,
            buffers: HashSet::new(),
            textures: HashSet::new(),
            views: HashSet::new(),
            samplers: HashSet::new(),
            pipelines: HashSet::new(),
            bind_groups: HashSet::new(),
            surface_view: None,
            stats: DeviceStats::default(),
            frames: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    #[inline]
    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Frames submitted so far, oldest first.
    #[inline]
    pub fn frames(&self) -> &[FrameCommands] {
        &self.frames
    }

    #[inline]
    pub fn last_frame(&self) -> Option<&FrameCommands> {
        self.frames.last()
    }

    /// Labels of every pipeline created, in creation order.
    #[inline]
    pub fn pipeline_labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of resources that were created and not yet destroyed, surface frame
    /// excluded.
    pub fn live_resources(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.views.len()
            + self.samplers.len()
            + self.pipelines.len()
            + self.bind_groups.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_live_buffer(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains(&buffer.raw())
    }

    fn allocate(&mut self) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        raw
    }

    fn release(set: &mut HashSet<u64>, raw: u64, stats: &mut DeviceStats) {
        if set.remove(&raw) {
            stats.resources_destroyed += 1;
        }
    }

    fn is_view(&self, view: TextureViewHandle) -> bool {
        self.views.contains(&view.raw()) || self.surface_view == Some(view)
    }

    fn validate(&self, frame: &FrameCommands) -> Result<(), GpuError> {
        for view in frame.pass.color.iter().chain(frame.pass.depth.iter()) {
            if !self.is_view(*view) {
                return Err(GpuError::InvalidHandle("texture view"));
            }
        }
        for command in &frame.commands {
            let known = match command {
                RenderCommand::SetPipeline(p) => self.pipelines.contains(&p.raw()),
                RenderCommand::SetBindGroup { group, .. } => self.bind_groups.contains(&group.raw()),
                RenderCommand::SetVertexBuffer { buffer, .. }
                | RenderCommand::SetIndexBuffer { buffer, .. } => {
                    self.buffers.contains(&buffer.raw())
                }
                RenderCommand::Draw { .. } | RenderCommand::DrawIndexed { .. } => true,
            };
            if !known {
                return Err(GpuError::InvalidHandle("render command"));
            }
        }
        Ok(())
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl GpuDevice for HeadlessDevice {
    fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn acquire_surface_view(&mut self) -> Result<TextureViewHandle, GpuError> {
        let view = TextureViewHandle::from_raw(self.allocate());
        self.surface_view = Some(view);
        Ok(view)
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError> {
        let raw = self.allocate();
        self.buffers.insert(raw);
        self.stats.buffers_created += 1;
        self.stats.bytes_written += desc.contents.len();
        Ok(BufferHandle::from_raw(raw))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), GpuError> {
        if !self.buffers.contains(&buffer.raw()) {
            return Err(GpuError::InvalidHandle("buffer"));
        }
        self.stats.buffer_writes += 1;
        self.stats.bytes_written += data.len();
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        Self::release(&mut self.buffers, buffer.raw(), &mut self.stats);
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, GpuError> {
        validate_texture(desc)?;
        let raw = self.allocate();
        self.textures.insert(raw);
        self.stats.textures_created += 1;
        Ok(TextureHandle::from_raw(raw))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        Self::release(&mut self.textures, texture.raw(), &mut self.stats);
    }

    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
    ) -> Result<TextureViewHandle, GpuError> {
        if !self.textures.contains(&texture.raw()) {
            return Err(GpuError::InvalidHandle("texture"));
        }
        let raw = self.allocate();
        self.views.insert(raw);
        self.stats.views_created += 1;
        Ok(TextureViewHandle::from_raw(raw))
    }

    fn destroy_texture_view(&mut self, view: TextureViewHandle) {
        Self::release(&mut self.views, view.raw(), &mut self.stats);
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<SamplerHandle, GpuError> {
        let raw = self.allocate();
        self.samplers.insert(raw);
        self.stats.samplers_created += 1;
        Ok(SamplerHandle::from_raw(raw))
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        Self::release(&mut self.samplers, sampler.raw(), &mut self.stats);
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineHandle, GpuError> {
        if desc.vertex_source.trim().is_empty() || desc.fragment_source.trim().is_empty() {
            return Err(GpuError::creation("pipeline", "empty shader source"));
        }
        let raw = self.allocate();
        self.pipelines.insert(raw);
        self.stats.pipelines_created += 1;
        self.labels.push(desc.label.to_owned());
        Ok(PipelineHandle::from_raw(raw))
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        Self::release(&mut self.pipelines, pipeline.raw(), &mut self.stats);
    }

    fn create_bind_group(
        &mut self,
        pipeline: PipelineHandle,
        desc: &BindGroupDesc<'_>,
    ) -> Result<BindGroupHandle, GpuError> {
        if !self.pipelines.contains(&pipeline.raw()) {
            return Err(GpuError::InvalidHandle("pipeline"));
        }
        for entry in desc.entries {
            let known = match entry {
                BindingResource::Buffer(b) => self.buffers.contains(&b.raw()),
                BindingResource::TextureView(v) => self.is_view(*v),
                BindingResource::Sampler(s) => self.samplers.contains(&s.raw()),
            };
            if !known {
                return Err(GpuError::InvalidHandle("binding resource"));
            }
        }
        let raw = self.allocate();
        self.bind_groups.insert(raw);
        self.stats.bind_groups_created += 1;
        Ok(BindGroupHandle::from_raw(raw))
    }

    fn destroy_bind_group(&mut self, group: BindGroupHandle) {
        Self::release(&mut self.bind_groups, group.raw(), &mut self.stats);
    }

    fn submit(&mut self, frame: FrameCommands) -> Result<(), GpuError> {
        let result = self.validate(&frame);
        self.surface_view = None;
        result?;
        self.stats.submits += 1;
        self.frames.push(frame);
        Ok(())
    }
}
