use super::ObjectId;

/// Pixel source of a [`Texture`].
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// Tightly packed 8-bit RGBA rows.
    Rgba8 {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Uninitialized storage, typically a render target attachment.
    Blank { width: u32, height: u32 },
}

impl TextureSource {
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Rgba8 { width, height, .. } | Self::Blank { width, height } => (*width, *height),
        }
    }

    #[inline]
    pub fn pixels(&self) -> Option<&[u8]> {
        match self {
            Self::Rgba8 { pixels, .. } => Some(pixels),
            Self::Blank { .. } => None,
        }
    }
}

/// Sampled image plus its sampling parameters.
///
/// Setting `needs_update` recreates the GPU texture (and its sampler) on the next
/// compile.
#[derive(Debug)]
pub struct Texture {
    id: ObjectId,
    pub source: TextureSource,
    pub format: wgpu::TextureFormat,
    pub wrap_u: wgpu::AddressMode,
    pub wrap_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::MipmapFilterMode,
    pub needs_update: bool,
}

impl Texture {
    pub fn new(source: TextureSource) -> Self {
        Self {
            id: ObjectId::next(),
            source,
            format: wgpu::TextureFormat::Rgba8Unorm,
            wrap_u: wgpu::AddressMode::ClampToEdge,
            wrap_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            needs_update: false,
        }
    }

    /// RGBA8 texture from raw pixels (`width * height * 4` bytes).
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(TextureSource::Rgba8 {
            width,
            height,
            pixels,
        })
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(TextureSource::Blank { width, height })
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.source.size()
    }

    pub fn with_wrap(mut self, wrap: wgpu::AddressMode) -> Self {
        self.wrap_u = wrap;
        self.wrap_v = wrap;
        self
    }

    pub fn with_filter(mut self, filter: wgpu::FilterMode) -> Self {
        self.mag_filter = filter;
        self.min_filter = filter;
        self
    }

    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Replaces the pixel source and marks the texture dirty.
    pub fn set_source(&mut self, source: TextureSource) {
        self.source = source;
        self.needs_update = true;
    }
}
