use std::fmt::Write as _;

use crate::cache::{Disposer, ResourceCache};
use crate::device::{
    ColorTarget, DepthState, GpuDevice, PipelineDesc, PipelineHandle, VertexBufferDesc,
};
use crate::scene::{AttributeKind, Blending, DrawMode, Geometry, Material, ObjectId, Side};

use super::RenderError;

/// Every render-state input that shapes a drawable's pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub transparent: bool,
    pub cull_mode: Option<wgpu::Face>,
    pub topology: wgpu::PrimitiveTopology,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub vertex_buffers: Vec<VertexBufferDesc>,
    pub blend: Option<wgpu::BlendState>,
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth_format: wgpu::TextureFormat,
    pub material: ObjectId,
    pub material_version: u64,
}

impl PipelineState {
    /// Derives the state for drawing `geometry` with `material` into `color_formats`.
    pub fn derive(
        mode: DrawMode,
        geometry: &Geometry,
        material: &Material,
        color_formats: &[wgpu::TextureFormat],
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let vertex_buffers = geometry
            .attributes()
            .iter()
            .enumerate()
            .map(|(location, attr)| {
                let kind = attr.data.kind();
                let format = vertex_format(kind, attr.item_size).ok_or_else(|| {
                    RenderError::UnsupportedAttribute {
                        name: attr.name.clone(),
                        kind,
                        item_size: attr.item_size,
                    }
                })?;
                Ok(VertexBufferDesc {
                    array_stride: format.size(),
                    attributes: vec![wgpu::VertexAttribute {
                        format,
                        offset: 0,
                        shader_location: location as u32,
                    }],
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        Ok(Self {
            transparent: material.transparent,
            cull_mode: cull_mode(material.side),
            topology: topology(mode),
            depth_write: material.depth_write,
            depth_compare: if material.depth_test {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            vertex_buffers,
            blend: material.transparent.then(|| blend_state(material.blending)),
            color_formats: color_formats.to_vec(),
            depth_format,
            material: material.id(),
            material_version: material.version(),
        })
    }

    /// Order- and value-sensitive serialization of the state; doubles as the pipeline label.
    pub fn key(&self) -> String {
        let mut key = String::with_capacity(128);
        let _ = write!(
            key,
            "m{}v{}|t{}|c{:?}|p{:?}|dw{}|dc{:?}|b{:?}|ct{}{:?}|ds{:?}",
            self.material.get(),
            self.material_version,
            self.transparent as u8,
            self.cull_mode,
            self.topology,
            self.depth_write as u8,
            self.depth_compare,
            self.blend,
            self.color_formats.len(),
            self.color_formats,
            self.depth_format,
        );
        for vb in &self.vertex_buffers {
            let _ = write!(key, "|vb{}", vb.array_stride);
            for a in &vb.attributes {
                let _ = write!(key, ":{:?}@{}+{}", a.format, a.shader_location, a.offset);
            }
        }
        key
    }
}

/// Front-facing materials cull back faces and vice versa.
pub fn cull_mode(side: Side) -> Option<wgpu::Face> {
    match side {
        Side::Front => Some(wgpu::Face::Back),
        Side::Back => Some(wgpu::Face::Front),
        Side::Both => None,
    }
}

pub fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
    }
}

fn component(src_factor: wgpu::BlendFactor, dst_factor: wgpu::BlendFactor) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation: wgpu::BlendOperation::Add,
    }
}

pub fn blend_state(blending: Blending) -> wgpu::BlendState {
    use wgpu::BlendFactor as F;
    match blending {
        Blending::Normal => wgpu::BlendState {
            color: component(F::SrcAlpha, F::OneMinusSrcAlpha),
            alpha: component(F::One, F::OneMinusSrcAlpha),
        },
        Blending::Additive => wgpu::BlendState {
            color: component(F::SrcAlpha, F::One),
            alpha: component(F::One, F::One),
        },
        Blending::Premultiplied => wgpu::BlendState {
            color: component(F::One, F::OneMinusSrcAlpha),
            alpha: component(F::One, F::OneMinusSrcAlpha),
        },
        Blending::Custom(state) => state,
    }
}

/// Vertex format for `item_size` components of `kind`. 16-bit inputs only exist in
/// pairs and quads.
pub fn vertex_format(kind: AttributeKind, item_size: u32) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as V;
    Some(match (kind, item_size) {
        (AttributeKind::Float32, 1) => V::Float32,
        (AttributeKind::Float32, 2) => V::Float32x2,
        (AttributeKind::Float32, 3) => V::Float32x3,
        (AttributeKind::Float32, 4) => V::Float32x4,
        (AttributeKind::Uint32, 1) => V::Uint32,
        (AttributeKind::Uint32, 2) => V::Uint32x2,
        (AttributeKind::Uint32, 3) => V::Uint32x3,
        (AttributeKind::Uint32, 4) => V::Uint32x4,
        (AttributeKind::Uint16, 2) => V::Uint16x2,
        (AttributeKind::Uint16, 4) => V::Uint16x4,
        _ => return None,
    })
}

#[derive(Debug)]
pub(crate) struct CompiledPipeline {
    pub key: String,
    pub handle: PipelineHandle,
    pub material: ObjectId,
}

/// Per-drawable pipeline cache; a pipeline is rebuilt only when its key changes.
#[derive(Default)]
pub(crate) struct PipelineCompiler {
    pub(crate) cache: ResourceCache<ObjectId, CompiledPipeline>,
}

impl PipelineCompiler {
    /// Returns the drawable's pipeline, building it if absent or stale.
    pub fn ensure<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        drawable: ObjectId,
        state: &PipelineState,
        material: &Material,
    ) -> Result<PipelineHandle, RenderError> {
        let key = state.key();
        if let Some(compiled) = self.cache.get(&drawable) {
            if compiled.key == key {
                return Ok(compiled.handle);
            }
        }

        let color_targets: Vec<ColorTarget> = state
            .color_formats
            .iter()
            .map(|&format| ColorTarget {
                format,
                blend: state.blend,
            })
            .collect();

        let handle = device.create_pipeline(&PipelineDesc {
            label: &key,
            vertex_source: material.vertex_source(),
            fragment_source: material.fragment_source(),
            vertex_buffers: &state.vertex_buffers,
            topology: state.topology,
            cull_mode: state.cull_mode,
            color_targets: &color_targets,
            depth: Some(DepthState {
                format: state.depth_format,
                write: state.depth_write,
                compare: state.depth_compare,
            }),
        })?;
        log::debug!("pipeline for drawable {drawable} (re)built");

        self.cache.set(
            drawable,
            CompiledPipeline {
                key,
                handle,
                material: state.material,
            },
            Some(Disposer::Pipeline(handle)),
            device,
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Attribute, POSITION};

    const FMT: [wgpu::TextureFormat; 1] = [wgpu::TextureFormat::Bgra8UnormSrgb];
    const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn geometry() -> Geometry {
        Geometry::new()
            .with_attribute(Attribute::new(POSITION, vec![0.0f32; 9], 3))
            .with_attribute(Attribute::new("uv", vec![0.0f32; 6], 2))
    }

    fn state(material: &Material) -> PipelineState {
        PipelineState::derive(DrawMode::Triangles, &geometry(), material, &FMT, DEPTH).unwrap()
    }

    // ── derivation ──────────────────────────────────────────────────────────

    #[test]
    fn side_maps_to_opposite_cull_face() {
        assert_eq!(cull_mode(Side::Front), Some(wgpu::Face::Back));
        assert_eq!(cull_mode(Side::Back), Some(wgpu::Face::Front));
        assert_eq!(cull_mode(Side::Both), None);
    }

    #[test]
    fn attributes_get_one_slot_each_in_order() {
        let s = state(&Material::from_module("x"));
        assert_eq!(s.vertex_buffers.len(), 2);
        assert_eq!(s.vertex_buffers[0].array_stride, 12);
        assert_eq!(s.vertex_buffers[1].attributes[0].shader_location, 1);
        assert_eq!(s.vertex_buffers[1].attributes[0].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn depth_test_off_compares_always_and_opaque_has_no_blend() {
        let s = state(&Material::from_module("x").with_depth(false, false));
        assert_eq!(s.depth_compare, wgpu::CompareFunction::Always);
        assert!(!s.depth_write);
        assert_eq!(s.blend, None);

        let s = state(&Material::from_module("x").with_transparent(true));
        assert_eq!(s.depth_compare, wgpu::CompareFunction::Less);
        assert_eq!(s.blend, Some(blend_state(Blending::Normal)));
    }

    #[test]
    fn odd_u16_attributes_are_rejected() {
        let g = Geometry::new().with_attribute(Attribute::new("ids", vec![0u16; 3], 3));
        let err = PipelineState::derive(
            DrawMode::Points,
            &g,
            &Material::from_module("x"),
            &FMT,
            DEPTH,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedAttribute { item_size: 3, .. }));
    }

    // ── key ─────────────────────────────────────────────────────────────────

    #[test]
    fn key_is_deterministic_and_state_sensitive() {
        let m = Material::from_module("x");
        assert_eq!(state(&m).key(), state(&m).key());

        let mut other = state(&m);
        other.topology = wgpu::PrimitiveTopology::LineList;
        assert_ne!(state(&m).key(), other.key());

        let mut two_targets = state(&m);
        two_targets.color_formats.push(wgpu::TextureFormat::Rgba8Unorm);
        assert_ne!(state(&m).key(), two_targets.key());
    }

    #[test]
    fn shader_edit_changes_key() {
        let mut m = Material::from_module("x");
        let before = state(&m).key();
        m.set_shaders("y", "y");
        assert_ne!(before, state(&m).key());
    }
}
