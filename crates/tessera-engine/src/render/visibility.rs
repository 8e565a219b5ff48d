use core::cmp::Ordering;

use glam::Mat4;

use crate::scene::{Camera, Mesh, Node, Scene, Visit};

/// Sort key for drawables.
///
/// Ordering rules:
/// 1) `depth_test`: disabled before enabled
/// 2) `depth`: descending projected depth (back-to-front); zero without a camera
/// 3) `transparent`: opaque before transparent
/// 4) `order`: ascending traversal order
#[derive(Debug, Copy, Clone)]
pub struct DrawKey {
    pub depth_test: bool,
    pub depth: f32,
    pub transparent: bool,
    pub order: u32,
}

impl Ord for DrawKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth_test
            .cmp(&other.depth_test)
            .then_with(|| other.depth.total_cmp(&self.depth))
            .then_with(|| self.transparent.cmp(&other.transparent))
            .then_with(|| self.order.cmp(&other.order))
    }
}

impl PartialOrd for DrawKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DrawKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DrawKey {}

/// A drawable that survived culling, with the world matrix it is drawn with.
#[derive(Debug, Copy, Clone)]
pub struct RenderItem<'a> {
    pub node: &'a Node,
    pub mesh: &'a Mesh,
    pub world: Mat4,
    pub key: DrawKey,
}

/// Collects visible drawables in traversal order.
///
/// World matrices must be current. Invisible nodes prune their subtree; culled
/// drawables are dropped individually.
pub fn collect<'a>(scene: &'a Scene, camera: Option<&Camera>) -> Vec<RenderItem<'a>> {
    let mut items = Vec::new();
    scene.traverse(&mut |node: &'a Node| {
        if !node.visible {
            return Visit::Skip;
        }
        let Some(mesh) = node.mesh() else {
            return Visit::Descend;
        };

        let world = node.matrix_world();
        if let Some(camera) = camera {
            if mesh.frustum_culled {
                let bounds = mesh.geometry.borrow_mut().bounding_sphere();
                if let Some(sphere) = bounds {
                    if !camera.frustum().intersects_sphere(&sphere.transformed(&world)) {
                        return Visit::Descend;
                    }
                }
            }
        }

        let depth = camera.map_or(0.0, |c| {
            c.view_projection()
                .project_point3(world.w_axis.truncate())
                .z
        });
        let material = mesh.material.borrow();
        items.push(RenderItem {
            node,
            mesh,
            world,
            key: DrawKey {
                depth_test: material.depth_test,
                depth,
                transparent: material.transparent,
                order: items.len() as u32,
            },
        });
        Visit::Descend
    });
    items
}

/// Stable sort by [`DrawKey`].
pub fn sort(items: &mut [RenderItem<'_>]) {
    items.sort_by(|a, b| a.key.cmp(&b.key));
}
