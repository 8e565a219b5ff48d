use core::ops::Range;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

handle!(
    /// GPU buffer (vertex, index or uniform).
    BufferHandle
);
handle!(
    /// GPU texture storage.
    TextureHandle
);
handle!(
    /// View over a texture or over the acquired surface frame.
    TextureViewHandle
);
handle!(SamplerHandle);
handle!(PipelineHandle);
handle!(BindGroupHandle);

#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    pub label: Option<&'a str>,
    pub usage: wgpu::BufferUsages,
    /// Initial contents; the device pads the allocation to a multiple of 4 bytes.
    pub contents: &'a [u8],
}

#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: Option<&'a str>,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    /// Tightly packed texel rows uploaded after creation.
    pub data: Option<&'a [u8]>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::MipmapFilterMode,
}

/// One vertex buffer slot: a single attribute per slot, stepped per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferDesc {
    pub array_stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorTarget {
    pub format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DepthState {
    pub format: wgpu::TextureFormat,
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

#[derive(Debug, Clone)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub vertex_buffers: &'a [VertexBufferDesc],
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub color_targets: &'a [ColorTarget],
    pub depth: Option<DepthState>,
}

/// Resource bound at the binding matching its position in [`BindGroupDesc::entries`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BindingResource {
    Buffer(BufferHandle),
    TextureView(TextureViewHandle),
    Sampler(SamplerHandle),
}

#[derive(Debug, Clone)]
pub struct BindGroupDesc<'a> {
    pub label: Option<&'a str>,
    /// Bind group index within the pipeline layout.
    pub group: u32,
    pub entries: &'a [BindingResource],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LoadAction<T> {
    Clear(T),
    Load,
}

/// The single render pass of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PassDesc {
    pub color: Vec<TextureViewHandle>,
    pub color_load: LoadAction<wgpu::Color>,
    pub depth: Option<TextureViewHandle>,
    pub depth_load: LoadAction<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    SetPipeline(PipelineHandle),
    SetBindGroup {
        index: u32,
        group: BindGroupHandle,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
    },
    SetIndexBuffer {
        buffer: BufferHandle,
        format: wgpu::IndexFormat,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

/// Commands of one frame, replayed inside a single render pass on submit.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCommands {
    pub pass: PassDesc,
    pub commands: Vec<RenderCommand>,
}

impl FrameCommands {
    pub fn new(pass: PassDesc) -> Self {
        Self {
            pass,
            commands: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    /// Number of draw calls recorded.
    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Draw { .. } | RenderCommand::DrawIndexed { .. }))
            .count()
    }

    /// Pipelines in the order they were bound.
    pub fn pipelines(&self) -> impl Iterator<Item = PipelineHandle> + '_ {
        self.commands.iter().filter_map(|c| match c {
            RenderCommand::SetPipeline(p) => Some(*p),
            _ => None,
        })
    }
}
