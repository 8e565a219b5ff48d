use crate::uniforms::Uniforms;

use super::ObjectId;

/// Which faces of a triangle are rendered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Both,
}

/// Color blending used when a material is `transparent`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum Blending {
    /// Straight alpha: `src * a + dst * (1 - a)`.
    #[default]
    Normal,
    /// `src * a + dst`.
    Additive,
    /// Premultiplied alpha: `src + dst * (1 - a)`.
    Premultiplied,
    Custom(wgpu::BlendState),
}

/// Shader sources, uniforms and fixed-function state of a drawable.
///
/// Shader sources are opaque WGSL strings and may be the same module for both stages.
/// Editing them through [`set_shaders`](Self::set_shaders) bumps the material version,
/// which invalidates every pipeline and uniform layout compiled from it.
#[derive(Debug)]
pub struct Material {
    id: ObjectId,
    version: u64,
    vertex: String,
    fragment: String,

    pub uniforms: Uniforms,

    pub transparent: bool,
    pub side: Side,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blending: Blending,
}

impl Material {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            id: ObjectId::next(),
            version: 0,
            vertex: vertex.into(),
            fragment: fragment.into(),
            uniforms: Uniforms::new(),
            transparent: false,
            side: Side::Front,
            depth_test: true,
            depth_write: true,
            blending: Blending::Normal,
        }
    }

    /// Material whose module holds both entry points.
    pub fn from_module(source: impl Into<String>) -> Self {
        let source = source.into();
        Self::new(source.clone(), source)
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn vertex_source(&self) -> &str {
        &self.vertex
    }

    #[inline]
    pub fn fragment_source(&self) -> &str {
        &self.fragment
    }

    pub fn set_shaders(&mut self, vertex: impl Into<String>, fragment: impl Into<String>) {
        self.vertex = vertex.into();
        self.fragment = fragment.into();
        self.version = self.version.wrapping_add(1);
    }

    pub fn with_uniform(
        mut self,
        name: impl Into<String>,
        value: impl Into<crate::uniforms::UniformValue>,
    ) -> Self {
        self.uniforms.set(name, value);
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_shaders_bumps_version() {
        let mut m = Material::from_module("fn vs() {}");
        assert_eq!(m.version(), 0);
        m.set_shaders("a", "b");
        assert_eq!(m.version(), 1);
        assert_eq!(m.vertex_source(), "a");
        assert_eq!(m.fragment_source(), "b");
    }
}
