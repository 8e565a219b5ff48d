use super::{Geometry, Material, ObjectId, Shared};

/// Primitive assembly of a drawable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    #[default]
    Triangles,
}

/// Drawable payload of a scene node.
///
/// The mesh identity keys its compiled pipeline and bind group; geometry and material
/// may be shared with other meshes.
#[derive(Debug)]
pub struct Mesh {
    id: ObjectId,
    pub geometry: Shared<Geometry>,
    pub material: Shared<Material>,
    pub mode: DrawMode,
    pub instance_count: u32,
    pub frustum_culled: bool,
}

impl Mesh {
    pub fn new(geometry: Shared<Geometry>, material: Shared<Material>) -> Self {
        Self {
            id: ObjectId::next(),
            geometry,
            material,
            mode: DrawMode::Triangles,
            instance_count: 1,
            frustum_culled: true,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn with_mode(mut self, mode: DrawMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_instances(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culled = enabled;
        self
    }
}
