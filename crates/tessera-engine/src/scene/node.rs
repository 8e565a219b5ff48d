use glam::{Mat4, Quat, Vec3};

use super::{Mesh, ObjectId};

/// Local translation/rotation/scale of a node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Transform placed at `eye` and oriented so that -Z points at `target`.
    pub fn looking_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self {
            translation: eye,
            rotation,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Traversal directive returned by visitors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Visit {
    /// Visit this node's children.
    Descend,
    /// Skip the subtree below this node.
    Skip,
}

/// Scene-graph node: a transform, optional drawable payload and children.
#[derive(Debug)]
pub struct Node {
    id: ObjectId,
    pub name: String,
    pub visible: bool,
    pub transform: Transform,
    /// Recompute the local matrix from `transform` during world-matrix updates.
    pub matrix_auto_update: bool,

    matrix: Mat4,
    matrix_world: Mat4,

    mesh: Option<Mesh>,
    children: Vec<Node>,
}

impl Node {
    /// Empty grouping node.
    pub fn new() -> Self {
        Self {
            id: ObjectId::next(),
            name: String::new(),
            visible: true,
            transform: Transform::IDENTITY,
            matrix_auto_update: true,
            matrix: Mat4::IDENTITY,
            matrix_world: Mat4::IDENTITY,
            mesh: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::new()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    #[inline]
    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        self.mesh.as_mut()
    }

    /// Appends a child and returns a reference to it.
    pub fn add(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Node> {
        let pos = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(pos))
    }

    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    /// Local matrix as of the last world-matrix update (or [`set_matrix`](Self::set_matrix)).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Overrides the local matrix; only meaningful with `matrix_auto_update` off.
    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.matrix = matrix;
    }

    #[inline]
    pub fn matrix_world(&self) -> Mat4 {
        self.matrix_world
    }

    /// World-space translation of the node.
    #[inline]
    pub fn world_position(&self) -> Vec3 {
        self.matrix_world.w_axis.truncate()
    }

    /// Recomputes world matrices for this subtree.
    pub fn update_world_matrix(&mut self, parent: &Mat4) {
        if self.matrix_auto_update {
            self.matrix = self.transform.matrix();
        }
        self.matrix_world = *parent * self.matrix;
        let world = self.matrix_world;
        for child in &mut self.children {
            child.update_world_matrix(&world);
        }
    }

    /// Depth-first, pre-order traversal. Returning [`Visit::Skip`] prunes the subtree.
    pub fn traverse<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a Node) -> Visit,
    {
        if visitor(self) == Visit::Skip {
            return;
        }
        for child in &self.children {
            child.traverse(visitor);
        }
    }

    pub fn traverse_mut<F>(&mut self, visitor: &mut F)
    where
        F: FnMut(&mut Node) -> Visit,
    {
        if visitor(self) == Visit::Skip {
            return;
        }
        for child in &mut self.children {
            child.traverse_mut(visitor);
        }
    }

    /// Finds a node by identity in this subtree.
    pub fn find(&self, id: ObjectId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

/// Root of a node tree.
#[derive(Debug, Default)]
pub struct Scene {
    pub root: Node,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level node.
    #[inline]
    pub fn add(&mut self, node: Node) -> &mut Node {
        self.root.add(node)
    }

    #[inline]
    pub fn find(&self, id: ObjectId) -> Option<&Node> {
        self.root.find(id)
    }

    #[inline]
    pub fn find_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn update_world_matrices(&mut self) {
        self.root.update_world_matrix(&Mat4::IDENTITY);
    }

    #[inline]
    pub fn traverse<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a Node) -> Visit,
    {
        self.root.traverse(visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Scene {
        let mut scene = Scene::new();
        let a = scene.add(Node::new().named("a").with_transform(Transform::from_translation(Vec3::X)));
        a.add(Node::new().named("a1").with_transform(Transform::from_translation(Vec3::Y)));
        scene.add(Node::new().named("b"));
        scene
    }

    fn names(scene: &Scene, mut skip: impl FnMut(&Node) -> bool) -> Vec<String> {
        let mut out = Vec::new();
        scene.traverse(&mut |n: &Node| {
            out.push(n.name.clone());
            if skip(n) { Visit::Skip } else { Visit::Descend }
        });
        out
    }

    #[test]
    fn traversal_is_depth_first_pre_order() {
        let scene = tree();
        assert_eq!(names(&scene, |_| false), ["", "a", "a1", "b"]);
    }

    #[test]
    fn skip_prunes_only_the_subtree() {
        let scene = tree();
        assert_eq!(names(&scene, |n| n.name == "a"), ["", "a", "b"]);
    }

    #[test]
    fn world_matrices_compose_parent_first() {
        let mut scene = tree();
        scene.update_world_matrices();
        let a1 = &scene.root.children()[0].children()[0];
        assert_eq!(a1.world_position(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn manual_matrix_survives_update() {
        let mut scene = Scene::new();
        let n = scene.add(Node::new());
        n.matrix_auto_update = false;
        n.set_matrix(Mat4::from_translation(Vec3::Z * 4.0));
        scene.update_world_matrices();
        assert_eq!(scene.root.children()[0].world_position(), Vec3::Z * 4.0);
    }

    #[test]
    fn looking_at_faces_target() {
        let t = Transform::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let forward = t.rotation * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_Z).length() < 1e-5);
    }
}
