use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::surface::{self, SurfaceState};
use super::types::*;
use super::{GpuDevice, GpuError, GpuInit, pad_to_copy_alignment, validate_texture};

/// Runs `create` inside validation and out-of-memory error scopes, so a rejected
/// descriptor or shader comes back as [`GpuError::ResourceCreation`] instead of
/// reaching wgpu's uncaptured-error handler.
fn scoped<T>(
    device: &wgpu::Device,
    resource: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, GpuError> {
    let oom = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let invalid = pollster::block_on(validation.pop());
    let exhausted = pollster::block_on(oom.pop());
    match invalid.or(exhausted) {
        Some(err) => {
            log::error!("{resource} rejected: {err}");
            Err(GpuError::creation(resource, err.to_string()))
        }
        None => Ok(value),
    }
}

/// [`GpuDevice`] over wgpu, bound to one presentable surface.
///
/// Owns the Adapter/Device/Queue, the surface configuration and one table per
/// resource kind mapping handles to wgpu objects.
pub struct WgpuDevice<'w> {
    /// Bound to the window; the window must outlive the device.
    surface: SurfaceState<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    next_handle: u64,
    buffers: HashMap<u64, wgpu::Buffer>,
    textures: HashMap<u64, wgpu::Texture>,
    views: HashMap<u64, wgpu::TextureView>,
    samplers: HashMap<u64, wgpu::Sampler>,
    pipelines: HashMap<u64, wgpu::RenderPipeline>,
    bind_groups: HashMap<u64, wgpu::BindGroup>,

    /// Acquired but not yet presented surface frame.
    frame: Option<(TextureViewHandle, wgpu::SurfaceTexture)>,
}

impl<'w> WgpuDevice<'w> {
    /// Creates a device presenting to `target`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'w>>,
        size: (u32, u32),
        init: GpuInit,
    ) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GpuError::AdapterUnavailable(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&init.device_descriptor())
            .await
            .map_err(|e| GpuError::DeviceUnavailable(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::pick_format(&caps, init.prefer_srgb)
            .ok_or_else(|| GpuError::SurfaceCreation("no supported surface formats".into()))?;
        let alpha_mode = surface::pick_alpha_mode(&caps, init.alpha_mode);
        let config = init.surface_config(format, alpha_mode, size);
        let surface = SurfaceState::new(surface, config, size, &device);

        let info = adapter.get_info();
        log::info!(
            "GPU device ready: {} ({:?}), surface {:?} {}x{}",
            info.name,
            info.backend,
            format,
            size.0,
            size.1
        );

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            next_handle: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            views: HashMap::new(),
            samplers: HashMap::new(),
            pipelines: HashMap::new(),
            bind_groups: HashMap::new(),
            frame: None,
        })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn allocate(&mut self) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        raw
    }

    fn encode(&self, frame: &FrameCommands) -> Result<wgpu::CommandBuffer, GpuError> {
        let color_ops = wgpu::Operations {
            load: match frame.pass.color_load {
                LoadAction::Clear(c) => wgpu::LoadOp::Clear(c),
                LoadAction::Load => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        };

        let color_attachments = frame
            .pass
            .color
            .iter()
            .map(|h| {
                let view = self
                    .views
                    .get(&h.raw())
                    .ok_or(GpuError::InvalidHandle("texture view"))?;
                Ok(Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: color_ops,
                    depth_slice: None,
                }))
            })
            .collect::<Result<Vec<_>, GpuError>>()?;

        let depth_stencil_attachment = match frame.pass.depth {
            Some(h) => {
                let view = self
                    .views
                    .get(&h.raw())
                    .ok_or(GpuError::InvalidHandle("depth view"))?;
                Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: match frame.pass.depth_load {
                            LoadAction::Clear(d) => wgpu::LoadOp::Clear(d),
                            LoadAction::Load => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                })
            }
            None => None,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tessera frame encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessera frame pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for command in &frame.commands {
                match command {
                    RenderCommand::SetPipeline(h) => {
                        let pipeline = self
                            .pipelines
                            .get(&h.raw())
                            .ok_or(GpuError::InvalidHandle("pipeline"))?;
                        pass.set_pipeline(pipeline);
                    }
                    RenderCommand::SetBindGroup { index, group } => {
                        let group = self
                            .bind_groups
                            .get(&group.raw())
                            .ok_or(GpuError::InvalidHandle("bind group"))?;
                        pass.set_bind_group(*index, group, &[]);
                    }
                    RenderCommand::SetVertexBuffer { slot, buffer } => {
                        let buffer = self
                            .buffers
                            .get(&buffer.raw())
                            .ok_or(GpuError::InvalidHandle("buffer"))?;
                        pass.set_vertex_buffer(*slot, buffer.slice(..));
                    }
                    RenderCommand::SetIndexBuffer { buffer, format } => {
                        let buffer = self
                            .buffers
                            .get(&buffer.raw())
                            .ok_or(GpuError::InvalidHandle("buffer"))?;
                        pass.set_index_buffer(buffer.slice(..), *format);
                    }
                    RenderCommand::Draw {
                        vertices,
                        instances,
                    } => pass.draw(vertices.clone(), instances.clone()),
                    RenderCommand::DrawIndexed {
                        indices,
                        base_vertex,
                        instances,
                    } => pass.draw_indexed(indices.clone(), *base_vertex, instances.clone()),
                }
            }
        }

        Ok(encoder.finish())
    }
}

impl GpuDevice for WgpuDevice<'_> {
    fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface.format()
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface.size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(&self.device, (width, height));
    }

    fn acquire_surface_view(&mut self) -> Result<TextureViewHandle, GpuError> {
        if let Some((stale, _)) = self.frame.take() {
            self.views.remove(&stale.raw());
        }

        let texture = self.surface.acquire(&self.device)?;

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let handle = TextureViewHandle::from_raw(self.allocate());
        self.views.insert(handle.raw(), view);
        self.frame = Some((handle, texture));
        Ok(handle)
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError> {
        let contents = pad_to_copy_alignment(desc.contents);
        let buffer = scoped(&self.device, "buffer", || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: desc.label,
                    contents: &contents,
                    usage: desc.usage | wgpu::BufferUsages::COPY_DST,
                })
        })?;
        let handle = BufferHandle::from_raw(self.allocate());
        log::trace!("buffer {:?} created: {} bytes", desc.label, contents.len());
        self.buffers.insert(handle.raw(), buffer);
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), GpuError> {
        let target = self
            .buffers
            .get(&buffer.raw())
            .ok_or(GpuError::InvalidHandle("buffer"))?;
        let data = pad_to_copy_alignment(data);
        if data.len() as u64 > target.size() {
            return Err(GpuError::creation(
                "buffer write",
                format!("{} bytes into a {} byte buffer", data.len(), target.size()),
            ));
        }
        self.queue.write_buffer(target, 0, &data);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(b) = self.buffers.remove(&buffer.raw()) {
            b.destroy();
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, GpuError> {
        validate_texture(desc)?;
        let limit = self.device.limits().max_texture_dimension_2d;
        if desc.width > limit || desc.height > limit {
            return Err(GpuError::creation(
                "texture",
                format!("{}x{} exceeds the {limit} texel limit", desc.width, desc.height),
            ));
        }

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = scoped(&self.device, "texture", || {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: desc.label,
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: desc.format,
                usage: desc.usage,
                view_formats: &[],
            });

            if let Some(data) = desc.data {
                let texel = desc.format.block_copy_size(None).unwrap_or(4);
                self.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    data,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(desc.width * texel),
                        rows_per_image: Some(desc.height),
                    },
                    size,
                );
            }
            texture
        })?;

        let handle = TextureHandle::from_raw(self.allocate());
        log::debug!(
            "texture {:?} created: {}x{} {:?}",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        self.textures.insert(handle.raw(), texture);
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(t) = self.textures.remove(&texture.raw()) {
            t.destroy();
        }
    }

    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
    ) -> Result<TextureViewHandle, GpuError> {
        let view = self
            .textures
            .get(&texture.raw())
            .ok_or(GpuError::InvalidHandle("texture"))?
            .create_view(&wgpu::TextureViewDescriptor::default());
        let handle = TextureViewHandle::from_raw(self.allocate());
        self.views.insert(handle.raw(), view);
        Ok(handle)
    }

    fn destroy_texture_view(&mut self, view: TextureViewHandle) {
        self.views.remove(&view.raw());
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, GpuError> {
        let sampler = scoped(&self.device, "sampler", || {
            self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("tessera sampler"),
                address_mode_u: desc.address_mode_u,
                address_mode_v: desc.address_mode_v,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: desc.mag_filter,
                min_filter: desc.min_filter,
                mipmap_filter: desc.mipmap_filter,
                ..Default::default()
            })
        })?;
        let handle = SamplerHandle::from_raw(self.allocate());
        self.samplers.insert(handle.raw(), sampler);
        Ok(handle)
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        self.samplers.remove(&sampler.raw());
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineHandle, GpuError> {
        if desc.vertex_source.trim().is_empty() || desc.fragment_source.trim().is_empty() {
            return Err(GpuError::creation("pipeline", "empty shader source"));
        }

        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = desc
            .vertex_buffers
            .iter()
            .map(|b| wgpu::VertexBufferLayout {
                array_stride: b.array_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &b.attributes,
            })
            .collect();

        let targets: Vec<Option<wgpu::ColorTargetState>> = desc
            .color_targets
            .iter()
            .map(|t| {
                Some(wgpu::ColorTargetState {
                    format: t.format,
                    blend: t.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        // Shader parse errors surface in the same scope as the pipeline.
        let pipeline = scoped(&self.device, "pipeline", || {
            let vertex_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.vertex_source.into()),
            });
            // A shared module serves both stages.
            let fragment_module = (desc.fragment_source != desc.vertex_source).then(|| {
                self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(desc.label),
                    source: wgpu::ShaderSource::Wgsl(desc.fragment_source.into()),
                })
            });

            self.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(desc.label),
                    // Layout is reflected from the shader.
                    layout: None,

                    vertex: wgpu::VertexState {
                        module: &vertex_module,
                        entry_point: None,
                        compilation_options: Default::default(),
                        buffers: &buffers,
                    },

                    fragment: Some(wgpu::FragmentState {
                        module: fragment_module.as_ref().unwrap_or(&vertex_module),
                        entry_point: None,
                        compilation_options: Default::default(),
                        targets: &targets,
                    }),

                    primitive: wgpu::PrimitiveState {
                        topology: desc.topology,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: desc.cull_mode,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },

                    depth_stencil: desc.depth.map(|d| wgpu::DepthStencilState {
                        format: d.format,
                        depth_write_enabled: d.write,
                        depth_compare: d.compare,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                })
        })?;

        let handle = PipelineHandle::from_raw(self.allocate());
        log::debug!("pipeline created: {}", desc.label);
        self.pipelines.insert(handle.raw(), pipeline);
        Ok(handle)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        self.pipelines.remove(&pipeline.raw());
    }

    fn create_bind_group(
        &mut self,
        pipeline: PipelineHandle,
        desc: &BindGroupDesc<'_>,
    ) -> Result<BindGroupHandle, GpuError> {
        let layout = self
            .pipelines
            .get(&pipeline.raw())
            .ok_or(GpuError::InvalidHandle("pipeline"))?
            .get_bind_group_layout(desc.group);

        let entries = desc
            .entries
            .iter()
            .enumerate()
            .map(|(binding, resource)| {
                let resource = match resource {
                    BindingResource::Buffer(h) => self
                        .buffers
                        .get(&h.raw())
                        .ok_or(GpuError::InvalidHandle("buffer"))?
                        .as_entire_binding(),
                    BindingResource::TextureView(h) => wgpu::BindingResource::TextureView(
                        self.views
                            .get(&h.raw())
                            .ok_or(GpuError::InvalidHandle("texture view"))?,
                    ),
                    BindingResource::Sampler(h) => wgpu::BindingResource::Sampler(
                        self.samplers
                            .get(&h.raw())
                            .ok_or(GpuError::InvalidHandle("sampler"))?,
                    ),
                };
                Ok(wgpu::BindGroupEntry {
                    binding: binding as u32,
                    resource,
                })
            })
            .collect::<Result<Vec<_>, GpuError>>()?;

        let group = scoped(&self.device, "bind group", || {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: desc.label,
                layout: &layout,
                entries: &entries,
            })
        })?;
        let handle = BindGroupHandle::from_raw(self.allocate());
        self.bind_groups.insert(handle.raw(), group);
        Ok(handle)
    }

    fn destroy_bind_group(&mut self, group: BindGroupHandle) {
        self.bind_groups.remove(&group.raw());
    }

    fn submit(&mut self, frame: FrameCommands) -> Result<(), GpuError> {
        let result = self.encode(&frame).map(|commands| {
            self.queue.submit(std::iter::once(commands));
        });

        if let Some((view, texture)) = self.frame.take() {
            self.views.remove(&view.raw());
            // An unpresented surface texture is discarded on drop.
            if result.is_ok() {
                texture.present();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Device without a surface, or `None` on machines with no adapter at all.
    fn bare_device() -> Option<wgpu::Device> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        let (device, _queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        Some(device)
    }

    #[test]
    fn invalid_shader_is_returned_as_an_error() {
        let Some(device) = bare_device() else {
            eprintln!("no GPU adapter; skipped");
            return;
        };
        let result = scoped(&device, "pipeline", || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: None,
                source: wgpu::ShaderSource::Wgsl("fn broken(".into()),
            })
        });
        assert!(matches!(
            result,
            Err(GpuError::ResourceCreation { resource: "pipeline", .. })
        ));
    }

    #[test]
    fn valid_creation_passes_through() {
        let Some(device) = bare_device() else {
            return;
        };
        let sampler = scoped(&device, "sampler", || {
            device.create_sampler(&wgpu::SamplerDescriptor::default())
        });
        assert!(sampler.is_ok());
    }
}
