use glam::{Mat3, Mat4};

use crate::cache::{Disposer, Reclaim, ResourceCache};
use crate::device::{
    BindGroupDesc, BindGroupHandle, BindingResource, BufferDesc, BufferHandle, FrameCommands,
    GpuDevice, GpuError, GpuInit, LoadAction, PassDesc, PipelineHandle, RenderCommand,
    SamplerDesc, SamplerHandle, TextureDesc, TextureHandle, TextureViewHandle, WgpuDevice,
};
use crate::scene::{
    Attribute, AttributeKind, Camera, Geometry, Material, Mesh, Node, ObjectId, POSITION,
    RenderTarget, Scene, Shared, Texture, Visit,
};
use crate::uniforms::{TextualReflection, UniformData, UniformReflection, UniformValue, pack_into};

use super::pipeline::{PipelineCompiler, PipelineState};
use super::visibility::{self, RenderItem};
use super::{RenderError, RendererConfig};

const TEXTURE_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::COPY_DST)
    .union(wgpu::TextureUsages::RENDER_ATTACHMENT);

#[derive(Debug, Copy, Clone)]
struct GpuBuffer {
    handle: BufferHandle,
    len: usize,
}

#[derive(Debug)]
struct UniformLayout {
    version: u64,
    /// `None` when the material declares no uniform block.
    names: Option<Vec<String>>,
}

#[derive(Debug)]
struct UniformBuffer {
    buffer: GpuBuffer,
    contents: Vec<f32>,
}

#[derive(Debug, Copy, Clone)]
struct GpuTexture {
    texture: TextureHandle,
    view: TextureViewHandle,
}

#[derive(Debug)]
struct GpuSampler {
    desc: SamplerDesc,
    handle: SamplerHandle,
}

#[derive(Debug)]
struct GpuBindGroup {
    pipeline: PipelineHandle,
    entries: Vec<BindingResource>,
    material: ObjectId,
    handle: BindGroupHandle,
}

#[derive(Debug, Copy, Clone)]
struct DepthBuffer {
    texture: TextureHandle,
    view: TextureViewHandle,
    size: (u32, u32),
}

impl DepthBuffer {
    fn disposer(&self) -> Disposer {
        Disposer::Composite(vec![
            Disposer::TextureView(self.view),
            Disposer::Texture(self.texture),
        ])
    }
}

#[derive(Debug)]
struct Framebuffer {
    /// Attachment textures with the views captured when the target was compiled.
    color: Vec<(ObjectId, TextureViewHandle)>,
    formats: Vec<wgpu::TextureFormat>,
    depth: DepthBuffer,
}

struct Attachments {
    color: Vec<TextureViewHandle>,
    formats: Vec<wgpu::TextureFormat>,
    depth: TextureViewHandle,
}

/// Everything needed to record one drawable's commands.
#[derive(Debug, Clone)]
struct PreparedDraw {
    pipeline: PipelineHandle,
    bind_group: Option<BindGroupHandle>,
    vertex_buffers: Vec<BufferHandle>,
    index: Option<(BufferHandle, wgpu::IndexFormat)>,
    count: u32,
    instances: u32,
}

impl PreparedDraw {
    fn record(&self, frame: &mut FrameCommands) {
        frame.push(RenderCommand::SetPipeline(self.pipeline));
        if let Some(group) = self.bind_group {
            frame.push(RenderCommand::SetBindGroup { index: 0, group });
        }
        for (slot, &buffer) in self.vertex_buffers.iter().enumerate() {
            frame.push(RenderCommand::SetVertexBuffer {
                slot: slot as u32,
                buffer,
            });
        }
        match self.index {
            Some((buffer, format)) => {
                frame.push(RenderCommand::SetIndexBuffer { buffer, format });
                frame.push(RenderCommand::DrawIndexed {
                    indices: 0..self.count,
                    base_vertex: 0,
                    instances: 0..self.instances,
                });
            }
            None => frame.push(RenderCommand::Draw {
                vertices: 0..self.count,
                instances: 0..self.instances,
            }),
        }
    }
}

/// Per-draw transform uniforms, supplied without touching the shared material.
struct BuiltIns {
    model: [f32; 16],
    camera: Option<CameraUniforms>,
}

struct CameraUniforms {
    projection: [f32; 16],
    view: [f32; 16],
    model_view: [f32; 16],
    normal: [f32; 12],
}

impl BuiltIns {
    fn new(world: &Mat4, camera: Option<&Camera>) -> Self {
        Self {
            model: world.to_cols_array(),
            camera: camera.map(|c| {
                let model_view = c.view_matrix() * *world;
                let n = Mat3::from_mat4(model_view).inverse().transpose();
                let mut normal = [0.0; 12];
                for (i, col) in [n.x_axis, n.y_axis, n.z_axis].into_iter().enumerate() {
                    normal[i * 4..i * 4 + 3].copy_from_slice(&col.to_array());
                }
                CameraUniforms {
                    projection: c.projection_matrix().to_cols_array(),
                    view: c.view_matrix().to_cols_array(),
                    model_view: model_view.to_cols_array(),
                    normal,
                }
            }),
        }
    }

    fn get(&self, name: &str) -> Option<UniformData<'_>> {
        let camera = self.camera.as_ref();
        let slice: &[f32] = match name {
            "modelMatrix" => &self.model,
            "projectionMatrix" => &camera?.projection,
            "viewMatrix" => &camera?.view,
            "modelViewMatrix" => &camera?.model_view,
            "normalMatrix" => &camera?.normal,
            _ => return None,
        };
        Some(UniformData::Vector(slice))
    }
}

/// Reclaimer that also understands the geometry hook: frees every listed attribute
/// buffer and re-marks the geometry's attributes dirty.
struct GeometryReclaim<'a, D: ?Sized> {
    device: &'a mut D,
    buffers: &'a mut ResourceCache<ObjectId, GpuBuffer>,
    geometry: Option<&'a mut Geometry>,
}

impl<D: GpuDevice + ?Sized> Reclaim for GeometryReclaim<'_, D> {
    fn reclaim(&mut self, disposer: Disposer) {
        match disposer {
            Disposer::Attributes(ids) => {
                for id in &ids {
                    self.buffers.delete(id, &mut *self.device);
                }
                if let Some(geometry) = self.geometry.as_deref_mut() {
                    for attr in geometry.all_attributes_mut() {
                        attr.needs_update = true;
                    }
                }
            }
            Disposer::Composite(list) => {
                for d in list {
                    self.reclaim(d);
                }
            }
            other => self.device.reclaim(other),
        }
    }
}

fn upload_attribute<D: GpuDevice + ?Sized>(
    device: &mut D,
    buffers: &mut ResourceCache<ObjectId, GpuBuffer>,
    attr: &mut Attribute,
    usage: wgpu::BufferUsages,
) -> Result<BufferHandle, GpuError> {
    let bytes = attr.data.as_bytes();
    if let Some(buffer) = buffers.get(&attr.id()).copied() {
        if !attr.needs_update {
            return Ok(buffer.handle);
        }
        if buffer.len == bytes.len() {
            device.write_buffer(buffer.handle, bytes)?;
            attr.needs_update = false;
            return Ok(buffer.handle);
        }
    }

    let handle = device.create_buffer(&BufferDesc {
        label: Some(attr.name.as_str()),
        usage,
        contents: bytes,
    })?;
    buffers.set(
        attr.id(),
        GpuBuffer {
            handle,
            len: bytes.len(),
        },
        Some(Disposer::Buffer(handle)),
        device,
    );
    attr.needs_update = false;
    Ok(handle)
}

/// Compiles scenes into GPU resources and records one render pass per frame.
///
/// All caches are keyed by [`ObjectId`]; a compiled resource lives until its CPU
/// object is marked dirty, reshaped or explicitly disposed.
pub struct Renderer<D: GpuDevice> {
    device: D,
    config: RendererConfig,
    reflection: Box<dyn UniformReflection>,
    target: Option<Shared<RenderTarget>>,

    buffers: ResourceCache<ObjectId, GpuBuffer>,
    geometries: ResourceCache<ObjectId, Vec<ObjectId>>,
    pipelines: PipelineCompiler,
    uniform_layouts: ResourceCache<ObjectId, UniformLayout>,
    ubos: ResourceCache<(ObjectId, ObjectId), UniformBuffer>,
    textures: ResourceCache<ObjectId, GpuTexture>,
    samplers: ResourceCache<TextureHandle, GpuSampler>,
    bind_groups: ResourceCache<ObjectId, GpuBindGroup>,
    framebuffers: ResourceCache<ObjectId, Framebuffer>,
    surface_depth: Option<DepthBuffer>,

    scratch: Vec<f32>,
}

impl<'w> Renderer<WgpuDevice<'w>> {
    /// Acquires a GPU device presenting to `target` and wraps it in a renderer.
    pub async fn init(
        target: impl Into<wgpu::SurfaceTarget<'w>>,
        size: (u32, u32),
        init: GpuInit,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let device = WgpuDevice::new(target, size, init).await?;
        Ok(Self::new(device, config))
    }
}

impl<D: GpuDevice> Renderer<D> {
    pub fn new(device: D, config: RendererConfig) -> Self {
        Self {
            device,
            config,
            reflection: Box::new(TextualReflection),
            target: None,
            buffers: ResourceCache::new(),
            geometries: ResourceCache::new(),
            pipelines: PipelineCompiler::default(),
            uniform_layouts: ResourceCache::new(),
            ubos: ResourceCache::new(),
            textures: ResourceCache::new(),
            samplers: ResourceCache::new(),
            bind_groups: ResourceCache::new(),
            framebuffers: ResourceCache::new(),
            surface_depth: None,
            scratch: Vec::new(),
        }
    }

    /// Replaces the uniform block discovery strategy.
    pub fn with_reflection(mut self, reflection: impl UniformReflection + 'static) -> Self {
        self.reflection = Box::new(reflection);
        self
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    /// Reconfigures the surface; the surface depth buffer follows on the next frame.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.device.resize(width, height);
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.device.surface_size()
    }

    /// Routes subsequent frames to `target`, or back to the surface with `None`.
    pub fn set_render_target(&mut self, target: Option<Shared<RenderTarget>>) {
        self.target = target;
    }

    #[inline]
    pub fn render_target(&self) -> Option<&Shared<RenderTarget>> {
        self.target.as_ref()
    }

    // ── frame ───────────────────────────────────────────────────────────────

    /// Refreshes camera and world matrices, then returns the visible drawables in
    /// draw order.
    pub fn sort<'s>(
        &self,
        scene: &'s mut Scene,
        camera: Option<&mut Camera>,
    ) -> Vec<RenderItem<'s>> {
        let camera = camera.map(|c| {
            if c.matrix_auto_update {
                c.update_matrices();
            }
            &*c
        });
        scene.update_world_matrices();
        let scene: &'s Scene = scene;

        let mut items = visibility::collect(scene, camera);
        visibility::sort(&mut items);
        items
    }

    /// Compiles every visible drawable below `node` without drawing.
    ///
    /// World matrices are used as they are; call [`Scene::update_world_matrices`] first.
    pub fn compile<'n>(&mut self, node: &'n Node, camera: Option<&Camera>) -> Result<(), RenderError> {
        let formats = self.color_formats();
        let mut meshes = Vec::new();
        node.traverse(&mut |n: &'n Node| {
            if !n.visible {
                return Visit::Skip;
            }
            if let Some(mesh) = n.mesh() {
                meshes.push((mesh, n.matrix_world()));
            }
            Visit::Descend
        });

        for (mesh, world) in meshes {
            self.prepare(mesh, &world, camera, &formats)?;
        }
        Ok(())
    }

    /// Renders one frame: resolve target, one pass over the sorted drawables, one
    /// submit. Nothing is submitted if any drawable fails to compile.
    pub fn render(&mut self, scene: &mut Scene, mut camera: Option<&mut Camera>) -> Result<(), RenderError> {
        if self.target.is_none() {
            let (w, h) = self.device.surface_size();
            if w == 0 || h == 0 {
                log::trace!("surface is {w}x{h}; frame skipped");
                return Ok(());
            }
        }

        let items = self.sort(scene, camera.as_deref_mut());
        let camera = camera.as_deref();

        let attachments = self.resolve_target()?;
        let (color_load, depth_load) = if self.config.auto_clear {
            (
                LoadAction::Clear(self.config.clear_color),
                LoadAction::Clear(self.config.clear_depth),
            )
        } else {
            (LoadAction::Load, LoadAction::Load)
        };
        let mut frame = FrameCommands::new(PassDesc {
            color: attachments.color,
            color_load,
            depth: Some(attachments.depth),
            depth_load,
        });

        for item in &items {
            let draw = self.prepare(item.mesh, &item.world, camera, &attachments.formats)?;
            draw.record(&mut frame);
        }

        log::trace!("submitting {} draws", frame.draw_calls());
        self.device.submit(frame)?;
        Ok(())
    }

    // ── per drawable ────────────────────────────────────────────────────────

    fn prepare(
        &mut self,
        mesh: &Mesh,
        world: &Mat4,
        camera: Option<&Camera>,
        formats: &[wgpu::TextureFormat],
    ) -> Result<PreparedDraw, RenderError> {
        let mut geometry = mesh.geometry.borrow_mut();
        let material = mesh.material.borrow();

        self.track_geometry(&mut geometry);
        let (vertex_buffers, index, count) = self.upload_geometry(&mut geometry)?;

        let state = PipelineState::derive(
            mesh.mode,
            &geometry,
            &material,
            formats,
            self.config.depth_format,
        )?;
        let pipeline = self
            .pipelines
            .ensure(&mut self.device, mesh.id(), &state, &material)?;

        let builtins = BuiltIns::new(world, camera);
        let mut entries = Vec::new();
        if let Some(ubo) = self.update_uniforms(mesh.id(), &material, &builtins)? {
            entries.push(BindingResource::Buffer(ubo));
        }
        for (_, texture) in material.uniforms.textures() {
            let (view, sampler) = self.ensure_texture(texture)?;
            entries.push(BindingResource::TextureView(view));
            entries.push(BindingResource::Sampler(sampler));
        }
        let bind_group = self.ensure_bind_group(mesh.id(), material.id(), pipeline, entries)?;

        Ok(PreparedDraw {
            pipeline,
            bind_group,
            vertex_buffers,
            index,
            count,
            instances: mesh.instance_count,
        })
    }

    /// Registers the geometry hook, re-running it when the attribute set changed shape.
    fn track_geometry(&mut self, geometry: &mut Geometry) {
        let id = geometry.id();
        let signature = geometry.layout_signature();
        if self.geometries.get(&id) == Some(&signature) {
            return;
        }
        if self.geometries.contains(&id) {
            log::debug!("geometry {id} changed shape; attribute buffers reset");
        }

        let mut reclaim = GeometryReclaim {
            device: &mut self.device,
            buffers: &mut self.buffers,
            geometry: Some(geometry),
        };
        self.geometries.set(
            id,
            signature.clone(),
            Some(Disposer::Attributes(signature)),
            &mut reclaim,
        );
    }

    #[allow(clippy::type_complexity)]
    fn upload_geometry(
        &mut self,
        geometry: &mut Geometry,
    ) -> Result<(Vec<BufferHandle>, Option<(BufferHandle, wgpu::IndexFormat)>, u32), RenderError> {
        let mut vertex_buffers = Vec::with_capacity(geometry.attributes().len());
        for attr in geometry.attributes_mut() {
            vertex_buffers.push(upload_attribute(
                &mut self.device,
                &mut self.buffers,
                attr,
                wgpu::BufferUsages::VERTEX,
            )?);
        }

        let mut index = None;
        if let Some(attr) = geometry.index_mut() {
            let format = match attr.data.kind() {
                AttributeKind::Uint16 => wgpu::IndexFormat::Uint16,
                AttributeKind::Uint32 => wgpu::IndexFormat::Uint32,
                kind => {
                    return Err(RenderError::UnsupportedAttribute {
                        name: attr.name.clone(),
                        kind,
                        item_size: attr.item_size,
                    });
                }
            };
            let count = attr.count();
            let handle = upload_attribute(
                &mut self.device,
                &mut self.buffers,
                attr,
                wgpu::BufferUsages::INDEX,
            )?;
            index = Some((handle, format, count));
        }

        let count = match index {
            Some((_, _, count)) => count,
            None => geometry
                .attribute(POSITION)
                .map(Attribute::count)
                .ok_or(RenderError::MissingPosition)?,
        };
        Ok((
            vertex_buffers,
            index.map(|(handle, format, _)| (handle, format)),
            count,
        ))
    }

    /// Packs the material's uniform block for this drawable and uploads it if it
    /// changed. Returns `None` when the material has no uniform block.
    fn update_uniforms(
        &mut self,
        mesh: ObjectId,
        material: &Material,
        builtins: &BuiltIns,
    ) -> Result<Option<BufferHandle>, RenderError> {
        let material_id = material.id();
        let stale = self
            .uniform_layouts
            .get(&material_id)
            .is_none_or(|l| l.version != material.version());
        if stale {
            let names = self
                .reflection
                .uniform_names_of(&[material.vertex_source(), material.fragment_source()]);
            log::debug!("material {material_id} uniform block: {names:?}");
            self.uniform_layouts.set(
                material_id,
                UniformLayout {
                    version: material.version(),
                    names,
                },
                None,
                &mut self.device,
            );
        }

        let Some(names) = self
            .uniform_layouts
            .get(&material_id)
            .and_then(|l| l.names.as_ref())
        else {
            return Ok(None);
        };

        // Every member needs a value; a gap would shift the offsets after it.
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let value = builtins
                .get(name)
                .or_else(|| material.uniforms.get(name).and_then(UniformValue::as_data))
                .ok_or_else(|| RenderError::MissingUniform {
                    material: material_id,
                    name: name.clone(),
                })?;
            values.push(value);
        }
        pack_into(&values, &mut self.scratch);
        if self.scratch.is_empty() {
            return Ok(None);
        }

        let key = (material_id, mesh);
        let bytes: &[u8] = bytemuck::cast_slice(&self.scratch);
        let existing = self
            .ubos
            .get(&key)
            .map(|u| (u.buffer, u.contents == self.scratch));

        match existing {
            Some((buffer, unchanged)) if buffer.len == bytes.len() => {
                if !unchanged {
                    self.device.write_buffer(buffer.handle, bytes)?;
                    if let Some(ubo) = self.ubos.get_mut(&key) {
                        ubo.contents.clone_from(&self.scratch);
                    }
                }
                Ok(Some(buffer.handle))
            }
            _ => {
                // A mesh keeps one UBO; drop the one left by its previous material.
                self.ubos.evict_where(
                    |&(m, owner), _| owner == mesh && m != material_id,
                    &mut self.device,
                );
                let handle = self.device.create_buffer(&BufferDesc {
                    label: Some("tessera uniforms"),
                    usage: wgpu::BufferUsages::UNIFORM,
                    contents: bytes,
                })?;
                self.ubos.set(
                    key,
                    UniformBuffer {
                        buffer: GpuBuffer {
                            handle,
                            len: bytes.len(),
                        },
                        contents: self.scratch.clone(),
                    },
                    Some(Disposer::Buffer(handle)),
                    &mut self.device,
                );
                Ok(Some(handle))
            }
        }
    }

    /// Materializes a texture and its sampler. A dirty texture is recreated; its
    /// sampler is keyed by the GPU texture and goes with it.
    fn ensure_texture(
        &mut self,
        texture: &Shared<Texture>,
    ) -> Result<(TextureViewHandle, SamplerHandle), RenderError> {
        let mut tex = texture.borrow_mut();
        let id = tex.id();
        let cached = self.textures.get(&id).copied();

        let gpu = match cached {
            Some(gpu) if !tex.needs_update => gpu,
            _ => {
                let (width, height) = tex.size();
                let handle = self.device.create_texture(&TextureDesc {
                    label: None,
                    width,
                    height,
                    format: tex.format,
                    usage: TEXTURE_USAGE,
                    data: tex.source.pixels(),
                })?;
                let view = match self.device.create_texture_view(handle) {
                    Ok(view) => view,
                    Err(e) => {
                        self.device.destroy_texture(handle);
                        return Err(e.into());
                    }
                };
                if let Some(old) = cached {
                    self.samplers.delete(&old.texture, &mut self.device);
                }

                let gpu = GpuTexture {
                    texture: handle,
                    view,
                };
                self.textures.set(
                    id,
                    gpu,
                    Some(Disposer::Composite(vec![
                        Disposer::TextureView(view),
                        Disposer::Texture(handle),
                    ])),
                    &mut self.device,
                );
                tex.needs_update = false;
                gpu
            }
        };

        let desc = SamplerDesc {
            address_mode_u: tex.wrap_u,
            address_mode_v: tex.wrap_v,
            mag_filter: tex.mag_filter,
            min_filter: tex.min_filter,
            mipmap_filter: tex.mipmap_filter,
        };
        let reusable = self
            .samplers
            .get(&gpu.texture)
            .filter(|s| s.desc == desc)
            .map(|s| s.handle);
        let sampler = match reusable {
            Some(handle) => handle,
            None => {
                let handle = self.device.create_sampler(&desc)?;
                self.samplers.set(
                    gpu.texture,
                    GpuSampler { desc, handle },
                    Some(Disposer::Sampler(handle)),
                    &mut self.device,
                );
                handle
            }
        };
        Ok((gpu.view, sampler))
    }

    fn ensure_bind_group(
        &mut self,
        mesh: ObjectId,
        material: ObjectId,
        pipeline: PipelineHandle,
        entries: Vec<BindingResource>,
    ) -> Result<Option<BindGroupHandle>, RenderError> {
        if entries.is_empty() {
            self.bind_groups.delete(&mesh, &mut self.device);
            return Ok(None);
        }

        let reusable = self
            .bind_groups
            .get(&mesh)
            .filter(|g| g.pipeline == pipeline && g.entries == entries)
            .map(|g| g.handle);
        if let Some(handle) = reusable {
            return Ok(Some(handle));
        }

        let handle = self.device.create_bind_group(
            pipeline,
            &BindGroupDesc {
                label: None,
                group: 0,
                entries: &entries,
            },
        )?;
        self.bind_groups.set(
            mesh,
            GpuBindGroup {
                pipeline,
                entries,
                material,
                handle,
            },
            Some(Disposer::BindGroup(handle)),
            &mut self.device,
        );
        Ok(Some(handle))
    }

    // ── targets ─────────────────────────────────────────────────────────────

    fn color_formats(&self) -> Vec<wgpu::TextureFormat> {
        match &self.target {
            Some(target) => target
                .borrow()
                .textures()
                .iter()
                .map(|t| t.borrow().format)
                .collect(),
            None => vec![self.device.surface_format()],
        }
    }

    fn create_depth(&mut self, width: u32, height: u32, label: &str) -> Result<DepthBuffer, GpuError> {
        let texture = self.device.create_texture(&TextureDesc {
            label: Some(label),
            width,
            height,
            format: self.config.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            data: None,
        })?;
        match self.device.create_texture_view(texture) {
            Ok(view) => Ok(DepthBuffer {
                texture,
                view,
                size: (width, height),
            }),
            Err(e) => {
                self.device.destroy_texture(texture);
                Err(e)
            }
        }
    }

    fn resolve_target(&mut self) -> Result<Attachments, RenderError> {
        if let Some(target) = self.target.clone() {
            return self.resolve_render_target(&target);
        }

        let size = self.device.surface_size();
        let depth = match self.surface_depth {
            Some(depth) if depth.size == size => depth,
            stale => {
                if let Some(old) = stale {
                    self.device.reclaim(old.disposer());
                    self.surface_depth = None;
                }
                let depth = self.create_depth(size.0, size.1, "tessera surface depth")?;
                self.surface_depth = Some(depth);
                depth
            }
        };

        let view = self.device.acquire_surface_view()?;
        Ok(Attachments {
            color: vec![view],
            formats: vec![self.device.surface_format()],
            depth: depth.view,
        })
    }

    fn resolve_render_target(&mut self, target: &Shared<RenderTarget>) -> Result<Attachments, RenderError> {
        let mut rt = target.borrow_mut();
        let id = rt.id();
        // Attachments may have been rebuilt or freed through the material path.
        let views_current = self.framebuffers.get(&id).is_some_and(|fb| {
            fb.color.len() == rt.textures().len()
                && fb.color.iter().zip(rt.textures()).all(|(&(tex, view), t)| {
                    t.borrow().id() == tex
                        && self.textures.get(&tex).map(|g| g.view) == Some(view)
                })
        });
        let stale = rt.needs_update
            || !views_current
            || rt.textures().iter().any(|t| t.borrow().needs_update);

        if stale {
            self.framebuffers.delete(&id, &mut self.device);

            let mut color = Vec::with_capacity(rt.textures().len());
            let mut formats = Vec::with_capacity(rt.textures().len());
            for texture in rt.textures() {
                let (view, _) = self.ensure_texture(texture)?;
                color.push((texture.borrow().id(), view));
                formats.push(texture.borrow().format);
            }

            let (width, height) = rt.size();
            let depth = self.create_depth(width, height, "tessera target depth")?;
            let disposer = depth.disposer();
            self.framebuffers.set(
                id,
                Framebuffer {
                    color,
                    formats,
                    depth,
                },
                Some(disposer),
                &mut self.device,
            );
            rt.needs_update = false;
            log::debug!("render target {id} compiled at {width}x{height}");
        }

        let fb = self
            .framebuffers
            .get(&id)
            .ok_or(GpuError::InvalidHandle("framebuffer"))?;
        Ok(Attachments {
            color: fb.color.iter().map(|&(_, view)| view).collect(),
            formats: fb.formats.clone(),
            depth: fb.depth.view,
        })
    }

    // ── disposal ────────────────────────────────────────────────────────────

    /// Frees the geometry's attribute buffers and re-marks its attributes dirty.
    pub fn dispose_geometry(&mut self, geometry: &Shared<Geometry>) {
        let mut geometry = geometry.borrow_mut();
        let id = geometry.id();
        let current = geometry.layout_signature();
        let mut reclaim = GeometryReclaim {
            device: &mut self.device,
            buffers: &mut self.buffers,
            geometry: Some(&mut *geometry),
        };
        if self.geometries.delete(&id, &mut reclaim).is_none() {
            reclaim.reclaim(Disposer::Attributes(current));
        }
    }

    /// Frees everything compiled from the material: uniform layout, UBOs, pipelines
    /// and bind groups of the drawables using it.
    pub fn dispose_material(&mut self, material: &Shared<Material>) {
        let id = material.borrow().id();
        self.uniform_layouts.delete(&id, &mut self.device);
        self.ubos.evict_where(|(m, _), _| *m == id, &mut self.device);
        self.pipelines
            .cache
            .evict_where(|_, p| p.material == id, &mut self.device);
        self.bind_groups
            .evict_where(|_, g| g.material == id, &mut self.device);
    }

    /// Frees the texture, its sampler and any render target compiled against it.
    pub fn dispose_texture(&mut self, texture: &Shared<Texture>) {
        let id = texture.borrow().id();
        self.framebuffers
            .evict_where(|_, fb| fb.color.iter().any(|&(t, _)| t == id), &mut self.device);
        if let Some(gpu) = self.textures.delete(&id, &mut self.device) {
            self.samplers.delete(&gpu.texture, &mut self.device);
        }
    }

    /// Frees the drawable's pipeline, bind group and UBOs. Shared geometry and
    /// materials are left alone.
    pub fn dispose_mesh(&mut self, mesh: &Mesh) {
        let id = mesh.id();
        self.pipelines.cache.delete(&id, &mut self.device);
        self.bind_groups.delete(&id, &mut self.device);
        self.ubos.evict_where(|(_, m), _| *m == id, &mut self.device);
    }

    /// Frees the target's depth buffer and attachment textures.
    pub fn dispose_render_target(&mut self, target: &Shared<RenderTarget>) {
        let rt = target.borrow();
        self.framebuffers.delete(&rt.id(), &mut self.device);
        for texture in rt.textures() {
            self.dispose_texture(texture);
        }
    }

    /// Releases every GPU resource the renderer owns. The renderer stays usable;
    /// the next frame recompiles from scratch.
    pub fn dispose(&mut self) {
        self.bind_groups.drain(&mut self.device);
        self.pipelines.cache.drain(&mut self.device);
        self.ubos.drain(&mut self.device);
        self.uniform_layouts.drain(&mut self.device);
        self.samplers.drain(&mut self.device);
        self.textures.drain(&mut self.device);
        self.framebuffers.drain(&mut self.device);
        self.geometries.drain(&mut GeometryReclaim {
            device: &mut self.device,
            buffers: &mut self.buffers,
            geometry: None,
        });
        self.buffers.drain(&mut self.device);
        if let Some(depth) = self.surface_depth.take() {
            self.device.reclaim(depth.disposer());
        }
        log::debug!("renderer resources released");
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::device::HeadlessDevice;
    use crate::scene::{Attribute, Projection, Transform, shared};

    const SHADER: &str = r#"
        struct Uniforms {
            modelMatrix: mat4x4<f32>,
            tint: vec4<f32>,
        };
        @group(0) @binding(0) var<uniform> u: Uniforms;

        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return u.modelMatrix * vec4<f32>(position, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return u.tint;
        }
    "#;

    const TEXTURED: &str = r#"
        struct Uniforms { modelMatrix: mat4x4<f32> };
        @group(0) @binding(0) var<uniform> u: Uniforms;
        @group(0) @binding(1) var map: texture_2d<f32>;
        @group(0) @binding(2) var map_sampler: sampler;
    "#;

    fn renderer() -> Renderer<HeadlessDevice> {
        Renderer::new(HeadlessDevice::new(320, 240), RendererConfig::default())
    }

    fn triangle() -> Geometry {
        Geometry::new().with_attribute(Attribute::new(
            POSITION,
            vec![-0.5f32, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0],
            3,
        ))
    }

    fn tinted() -> Material {
        Material::from_module(SHADER).with_uniform("tint", [1.0f32, 0.0, 0.0, 1.0])
    }

    /// Scene with one triangle; returns the mesh's geometry and material handles.
    fn one_mesh() -> (Scene, Shared<Geometry>, Shared<Material>) {
        let geometry = shared(triangle());
        let material = shared(tinted());
        let mut scene = Scene::new();
        scene.add(Node::with_mesh(Mesh::new(geometry.clone(), material.clone())));
        (scene, geometry, material)
    }

    fn draws(renderer: &Renderer<HeadlessDevice>) -> Vec<RenderCommand> {
        renderer
            .device()
            .last_frame()
            .map(|f| {
                f.commands
                    .iter()
                    .filter(|c| {
                        matches!(c, RenderCommand::Draw { .. } | RenderCommand::DrawIndexed { .. })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // ── pipelines ───────────────────────────────────────────────────────────

    #[test]
    fn unchanged_state_reuses_pipeline() {
        let (mut scene, _, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().stats().pipelines_created, 1);

        r.render(&mut scene, None).unwrap();
        r.compile(&scene.root, None).unwrap();
        assert_eq!(r.device().stats().pipelines_created, 1);
        assert_eq!(r.device().stats().bind_groups_created, 1);
    }

    #[test]
    fn state_change_rebuilds_pipeline_and_bind_group() {
        let (mut scene, _, material) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();

        material.borrow_mut().transparent = true;
        r.render(&mut scene, None).unwrap();
        let stats = r.device().stats();
        assert_eq!(stats.pipelines_created, 2);
        assert_eq!(stats.bind_groups_created, 2);

        let labels = r.device().pipeline_labels();
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn pipeline_failure_abandons_the_frame() {
        let mut scene = Scene::new();
        scene.add(Node::with_mesh(Mesh::new(
            shared(triangle()),
            shared(Material::from_module("")),
        )));
        let mut r = renderer();
        assert!(matches!(
            r.render(&mut scene, None),
            Err(RenderError::Gpu(GpuError::ResourceCreation { .. }))
        ));
        assert_eq!(r.device().stats().submits, 0);
    }

    // ── attributes ──────────────────────────────────────────────────────────

    #[test]
    fn dirty_attribute_is_rewritten_exactly_once() {
        let (mut scene, geometry, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        r.render(&mut scene, None).unwrap();
        let before = r.device().stats();

        geometry
            .borrow_mut()
            .attribute_mut(POSITION)
            .unwrap()
            .needs_update = true;
        r.render(&mut scene, None).unwrap();

        let after = r.device().stats();
        assert_eq!(after.buffer_writes, before.buffer_writes + 1);
        assert_eq!(after.buffers_created, before.buffers_created);
        assert!(!geometry.borrow().attribute(POSITION).unwrap().needs_update);
    }

    #[test]
    fn resized_attribute_is_reallocated() {
        let (mut scene, geometry, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        let before = r.device().stats();

        geometry
            .borrow_mut()
            .attribute_mut(POSITION)
            .unwrap()
            .set_data(vec![0.0f32; 18]);
        r.render(&mut scene, None).unwrap();

        let after = r.device().stats();
        assert_eq!(after.buffers_created, before.buffers_created + 1);
        assert_eq!(after.resources_destroyed, before.resources_destroyed + 1);
        assert_eq!(draws(&r)[0], RenderCommand::Draw {
            vertices: 0..6,
            instances: 0..1,
        });
    }

    #[test]
    fn reshaped_geometry_resets_every_attribute() {
        let (mut scene, geometry, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        let live = r.device().live_buffers();

        geometry
            .borrow_mut()
            .set_attribute(Attribute::new("uv", vec![0.0f32; 6], 2));
        r.render(&mut scene, None).unwrap();

        // old position buffer freed, position and uv uploaded anew
        assert_eq!(r.device().live_buffers(), live + 1);
        let stats = r.device().stats();
        assert_eq!(stats.buffers_created, 2 + 2);
        assert!(geometry.borrow().all_attributes().all(|a| !a.needs_update));
    }

    #[test]
    fn indexed_draw_uses_index_count_and_instances() {
        let geometry = triangle().with_index(Attribute::new("index", vec![0u16, 1, 2, 2, 1, 0], 1));
        let mut scene = Scene::new();
        scene.add(Node::with_mesh(
            Mesh::new(shared(geometry), shared(tinted())).with_instances(3),
        ));
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();

        let frame = r.device().last_frame().unwrap();
        let bound = frame.commands.iter().find_map(|c| match c {
            RenderCommand::SetIndexBuffer { buffer, format } => Some((*buffer, *format)),
            _ => None,
        });
        let (buffer, format) = bound.expect("index buffer bound");
        assert_eq!(format, wgpu::IndexFormat::Uint16);
        assert!(r.device().is_live_buffer(buffer));
        assert_eq!(draws(&r), [RenderCommand::DrawIndexed {
            indices: 0..6,
            base_vertex: 0,
            instances: 0..3,
        }]);
    }

    #[test]
    fn geometry_without_position_or_index_fails() {
        let geometry = Geometry::new().with_attribute(Attribute::new("uv", vec![0.0f32; 6], 2));
        let mut scene = Scene::new();
        scene.add(Node::with_mesh(Mesh::new(shared(geometry), shared(tinted()))));
        let mut r = renderer();
        assert!(matches!(
            r.render(&mut scene, None),
            Err(RenderError::MissingPosition)
        ));
    }

    // ── uniforms ────────────────────────────────────────────────────────────

    #[test]
    fn unchanged_uniforms_are_not_rewritten() {
        let (mut scene, _, material) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        let writes = r.device().stats().buffer_writes;

        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().stats().buffer_writes, writes);

        material.borrow_mut().uniforms.set("tint", [0.0f32, 1.0, 0.0, 1.0]);
        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().stats().buffer_writes, writes + 1);
    }

    #[test]
    fn shared_material_gets_one_ubo_per_drawable() {
        let material = shared(tinted());
        let mut scene = Scene::new();
        for x in [-1.0, 1.0] {
            scene.add(
                Node::with_mesh(Mesh::new(shared(triangle()), material.clone()))
                    .with_transform(Transform::from_translation(Vec3::X * x)),
            );
        }
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        // two position buffers, two UBOs
        assert_eq!(r.device().stats().buffers_created, 4);
        assert_eq!(r.device().stats().bind_groups_created, 2);
    }

    #[test]
    fn material_without_uniform_block_binds_nothing() {
        let src = "@vertex fn vs() {}\n@fragment fn fs() {}";
        let mut scene = Scene::new();
        scene.add(Node::with_mesh(Mesh::new(
            shared(triangle()),
            shared(Material::from_module(src)),
        )));
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();

        let frame = r.device().last_frame().unwrap();
        assert!(!frame.commands.iter().any(|c| matches!(c, RenderCommand::SetBindGroup { .. })));
        assert_eq!(r.device().stats().buffers_created, 1);
    }

    #[test]
    fn missing_uniform_value_fails_the_frame() {
        let mut scene = Scene::new();
        scene.add(Node::with_mesh(Mesh::new(
            shared(triangle()),
            shared(Material::from_module(SHADER)),
        )));
        let mut r = renderer();
        let err = r.render(&mut scene, None).unwrap_err();
        assert!(matches!(err, RenderError::MissingUniform { ref name, .. } if name == "tint"));
        assert_eq!(r.device().stats().submits, 0);
    }

    #[test]
    fn swapping_materials_keeps_one_ubo_per_mesh() {
        let (mut scene, _, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        let live = r.device().live_buffers();

        for _ in 0..10 {
            if let Some(mesh) = scene.root.children_mut()[0].mesh_mut() {
                mesh.material = shared(tinted());
            }
            r.render(&mut scene, None).unwrap();
        }
        assert_eq!(r.device().live_buffers(), live);
        assert_eq!(r.ubos.len(), 1);
    }

    #[test]
    fn camera_matrices_are_available_as_builtins() {
        let mut cam = Camera::new(Projection::default());
        cam.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let builtins = BuiltIns::new(&Mat4::from_translation(Vec3::X), Some(&cam));

        let Some(UniformData::Vector(mv)) = builtins.get("modelViewMatrix") else {
            panic!("modelViewMatrix missing");
        };
        let expected = (cam.view_matrix() * Mat4::from_translation(Vec3::X)).to_cols_array();
        assert_eq!(mv, &expected[..]);
        assert!(matches!(builtins.get("normalMatrix"), Some(UniformData::Vector(n)) if n.len() == 12));
        assert!(BuiltIns::new(&Mat4::IDENTITY, None).get("viewMatrix").is_none());
    }

    // ── textures ────────────────────────────────────────────────────────────

    fn textured_scene(texture: &Shared<Texture>) -> Scene {
        let material = Material::from_module(TEXTURED).with_uniform("map", texture.clone());
        let mut scene = Scene::new();
        scene.add(Node::with_mesh(Mesh::new(shared(triangle()), shared(material))));
        scene
    }

    #[test]
    fn textures_and_samplers_are_cached() {
        let texture = shared(Texture::from_rgba8(2, 2, vec![255; 16]));
        let mut scene = textured_scene(&texture);
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        r.render(&mut scene, None).unwrap();

        let stats = r.device().stats();
        assert_eq!(stats.textures_created, 2); // map + surface depth
        assert_eq!(stats.samplers_created, 1);
        assert_eq!(stats.bind_groups_created, 1);
    }

    #[test]
    fn dirty_texture_replaces_texture_and_sampler() {
        let texture = shared(Texture::from_rgba8(2, 2, vec![255; 16]));
        let mut scene = textured_scene(&texture);
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        let live = r.device().live_resources();

        texture.borrow_mut().set_source(crate::scene::TextureSource::Rgba8 {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        });
        r.render(&mut scene, None).unwrap();

        let stats = r.device().stats();
        assert_eq!(stats.textures_created, 3);
        assert_eq!(stats.samplers_created, 2);
        assert_eq!(stats.bind_groups_created, 2);
        assert_eq!(r.device().live_resources(), live);
        assert!(!texture.borrow().needs_update);
    }

    #[test]
    fn sampler_follows_filter_changes() {
        let texture = shared(Texture::from_rgba8(2, 2, vec![255; 16]));
        let mut scene = textured_scene(&texture);
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();

        texture.borrow_mut().mag_filter = wgpu::FilterMode::Nearest;
        r.render(&mut scene, None).unwrap();
        let stats = r.device().stats();
        assert_eq!(stats.textures_created, 2);
        assert_eq!(stats.samplers_created, 2);
    }

    // ── render targets ──────────────────────────────────────────────────────

    #[test]
    fn render_target_is_compiled_once_and_on_resize() {
        let (mut scene, _, _) = one_mesh();
        let target = shared(RenderTarget::new(64, 64, 2));
        let mut r = renderer();
        r.set_render_target(Some(target.clone()));

        r.render(&mut scene, None).unwrap();
        r.render(&mut scene, None).unwrap();
        // two attachments + depth
        assert_eq!(r.device().stats().textures_created, 3);
        let pass = &r.device().last_frame().unwrap().pass;
        assert_eq!(pass.color.len(), 2);
        assert!(pass.depth.is_some());
        assert!(r.device().pipeline_labels()[0].contains("ct2"));

        target.borrow_mut().set_size(128, 128);
        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().stats().textures_created, 6);
        assert!(!target.borrow().needs_update);
    }

    /// Offscreen scene drawn into `target` and a main scene sampling its attachment.
    fn target_and_viewer() -> (Shared<RenderTarget>, Shared<Texture>, Scene, Scene) {
        let target = shared(RenderTarget::new(16, 16, 1));
        let attachment = target.borrow().texture().cloned().unwrap();
        let (offscreen, _, _) = one_mesh();
        let main = textured_scene(&attachment);
        (target, attachment, offscreen, main)
    }

    fn attachment_view(r: &Renderer<HeadlessDevice>, texture: &Shared<Texture>) -> TextureViewHandle {
        r.textures.get(&texture.borrow().id()).unwrap().view
    }

    #[test]
    fn target_follows_attachment_rebuilt_by_a_material() {
        let (target, attachment, mut offscreen, mut main) = target_and_viewer();
        let mut r = renderer();
        r.set_render_target(Some(target.clone()));
        r.render(&mut offscreen, None).unwrap();
        r.set_render_target(None);
        r.render(&mut main, None).unwrap();

        attachment.borrow_mut().needs_update = true;
        r.render(&mut main, None).unwrap();

        r.set_render_target(Some(target));
        r.render(&mut offscreen, None).unwrap();
        let pass = &r.device().last_frame().unwrap().pass;
        assert_eq!(pass.color, vec![attachment_view(&r, &attachment)]);
    }

    #[test]
    fn disposed_attachment_recompiles_the_target() {
        let (target, attachment, mut offscreen, _) = target_and_viewer();
        let mut r = renderer();
        r.set_render_target(Some(target));
        r.render(&mut offscreen, None).unwrap();
        let live = r.device().live_resources();

        r.dispose_texture(&attachment);
        assert!(r.framebuffers.is_empty());

        r.render(&mut offscreen, None).unwrap();
        let pass = &r.device().last_frame().unwrap().pass;
        assert_eq!(pass.color, vec![attachment_view(&r, &attachment)]);
        assert_eq!(r.device().live_resources(), live);
    }

    #[test]
    fn switching_back_to_surface_uses_surface_format() {
        let (mut scene, _, _) = one_mesh();
        let mut r = renderer();
        r.set_render_target(Some(shared(RenderTarget::new(16, 16, 1))));
        r.render(&mut scene, None).unwrap();
        r.set_render_target(None);
        r.render(&mut scene, None).unwrap();

        // color format is part of the key
        assert_eq!(r.device().stats().pipelines_created, 2);
    }

    #[test]
    fn surface_depth_follows_size() {
        let (mut scene, _, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        r.set_size(640, 480);
        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().stats().textures_created, 2);

        r.set_size(0, 0);
        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().stats().submits, 2);
    }

    #[test]
    fn load_actions_follow_auto_clear() {
        let (mut scene, _, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        assert!(matches!(
            r.device().last_frame().unwrap().pass.color_load,
            LoadAction::Clear(_)
        ));

        r.config_mut().auto_clear = false;
        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().last_frame().unwrap().pass.color_load, LoadAction::Load);
    }

    // ── ordering ────────────────────────────────────────────────────────────

    #[test]
    fn sort_is_idempotent_with_a_camera() {
        let mut scene = Scene::new();
        for z in [0.0, -3.0, 2.0, -1.0] {
            scene.add(
                Node::with_mesh(Mesh::new(shared(triangle()), shared(tinted())))
                    .with_transform(Transform::from_translation(Vec3::Z * z)),
            );
        }
        let mut cam = Camera::default();
        cam.look_at(Vec3::new(0.0, 0.0, 8.0), Vec3::ZERO, Vec3::Y);
        let r = renderer();

        let first: Vec<ObjectId> = r
            .sort(&mut scene, Some(&mut cam))
            .iter()
            .map(|i| i.node.id())
            .collect();
        let second: Vec<ObjectId> = r
            .sort(&mut scene, Some(&mut cam))
            .iter()
            .map(|i| i.node.id())
            .collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn culled_drawables_are_not_compiled() {
        let (mut scene, _, _) = one_mesh();
        scene.add(
            Node::with_mesh(Mesh::new(shared(triangle()), shared(tinted())))
                .with_transform(Transform::from_translation(Vec3::Z * 100.0)),
        );
        let mut cam = Camera::default();
        cam.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let mut r = renderer();
        r.render(&mut scene, Some(&mut cam)).unwrap();

        assert_eq!(draws(&r).len(), 1);
        assert_eq!(r.device().stats().pipelines_created, 1);
    }

    // ── disposal ────────────────────────────────────────────────────────────

    #[test]
    fn dispose_releases_everything() {
        let texture = shared(Texture::from_rgba8(2, 2, vec![255; 16]));
        let mut scene = textured_scene(&texture);
        let (other, _, _) = one_mesh();
        for node in other.root.children() {
            if let Some(mesh) = node.mesh() {
                scene.add(Node::with_mesh(Mesh::new(
                    mesh.geometry.clone(),
                    mesh.material.clone(),
                )));
            }
        }
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        r.set_render_target(Some(shared(RenderTarget::new(8, 8, 1))));
        r.render(&mut scene, None).unwrap();
        assert!(r.device().live_resources() > 0);

        r.dispose();
        assert_eq!(r.device().live_resources(), 0);

        // still usable afterwards
        r.render(&mut scene, None).unwrap();
        assert!(r.device().live_resources() > 0);
    }

    #[test]
    fn dispose_geometry_marks_attributes_dirty() {
        let (mut scene, geometry, _) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        let live = r.device().live_buffers();

        r.dispose_geometry(&geometry);
        assert_eq!(r.device().live_buffers(), live - 1);
        assert!(geometry.borrow().attribute(POSITION).unwrap().needs_update);

        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().live_buffers(), live);
    }

    #[test]
    fn dispose_material_and_mesh_free_their_resources() {
        let (mut scene, _, material) = one_mesh();
        let mut r = renderer();
        r.render(&mut scene, None).unwrap();
        let before = r.device().live_resources();

        r.dispose_material(&material);
        // UBO, pipeline and bind group
        assert_eq!(r.device().live_resources(), before - 3);

        r.render(&mut scene, None).unwrap();
        assert_eq!(r.device().live_resources(), before);

        let mesh_node = &scene.root.children()[0];
        if let Some(mesh) = mesh_node.mesh() {
            r.dispose_mesh(mesh);
        }
        assert_eq!(r.device().live_resources(), before - 3);
    }
}
