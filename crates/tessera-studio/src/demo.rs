use glam::{Quat, Vec3};

use tessera_engine::scene::{
    Attribute, Camera, Geometry, Material, Mesh, Node, ObjectId, POSITION, RenderTarget, Scene,
    Shared, Side, Texture, Transform, shared,
};

const LIT: &str = include_str!("../shaders/lit.wgsl");
const TEXTURED: &str = include_str!("../shaders/textured.wgsl");

pub const OFFSCREEN_SIZE: u32 = 256;

/// Axis-aligned cube with per-face normals, 24 vertices and 36 indices.
pub fn cube(size: f32) -> Geometry {
    let h = size * 0.5;
    // (normal, u, v) with u x v = normal, so corners below wind counter-clockwise
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut positions = Vec::with_capacity(24 * 3);
    let mut normals = Vec::with_capacity(24 * 3);
    let mut indices: Vec<u16> = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let base = (positions.len() / 3) as u16;
        for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (n + u * su + v * sv) * h;
            positions.extend_from_slice(&p.to_array());
            normals.extend_from_slice(&n.to_array());
        }
        indices.extend([0, 1, 2, 0, 2, 3].map(|i| base + i));
    }

    Geometry::new()
        .with_attribute(Attribute::new(POSITION, positions, 3))
        .with_attribute(Attribute::new("normal", normals, 3))
        .with_index(Attribute::new("index", indices, 1))
}

fn quad_positions(size: f32) -> Vec<f32> {
    let h = size * 0.5;
    vec![-h, -h, 0.0, h, -h, 0.0, h, h, 0.0, -h, h, 0.0]
}

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// XY quad facing +Z, with normals for the lit shader.
pub fn lit_quad(size: f32) -> Geometry {
    Geometry::new()
        .with_attribute(Attribute::new(POSITION, quad_positions(size), 3))
        .with_attribute(Attribute::new("normal", [0.0f32, 0.0, 1.0].repeat(4), 3))
        .with_index(Attribute::new("index", QUAD_INDICES.to_vec(), 1))
}

/// XY quad facing +Z, with texture coordinates (v down).
pub fn textured_quad(size: f32) -> Geometry {
    Geometry::new()
        .with_attribute(Attribute::new(POSITION, quad_positions(size), 3))
        .with_attribute(Attribute::new(
            "uv",
            vec![0.0f32, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            2,
        ))
        .with_index(Attribute::new("index", QUAD_INDICES.to_vec(), 1))
}

/// Two-tone checkerboard, `cells` squares per side.
pub fn checker(size: u32, cells: u32) -> Texture {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            pixels.extend_from_slice(if on { &[235, 235, 235, 255] } else { &[40, 40, 48, 255] });
        }
    }
    Texture::from_rgba8(size, size, pixels).with_filter(wgpu::FilterMode::Nearest)
}

pub fn lit(color: [f32; 4]) -> Material {
    Material::from_module(LIT).with_uniform("color", color)
}

pub fn textured(map: Shared<Texture>) -> Material {
    Material::from_module(TEXTURED)
        .with_uniform("map", map)
        .with_side(Side::Both)
}

/// Rotates the node found under `id` about Y and X by `angle`.
pub fn spin(scene: &mut Scene, id: ObjectId, angle: f32) {
    if let Some(node) = scene.find_mut(id) {
        node.transform.rotation = Quat::from_rotation_y(angle) * Quat::from_rotation_x(angle * 0.5);
    }
}

/// Scene shown in the window.
pub struct MainScene {
    pub scene: Scene,
    pub camera: Camera,
    pub cube: ObjectId,
}

/// Scene rendered into an off-screen target each frame and shown on a panel.
pub struct OffscreenScene {
    pub scene: Scene,
    pub camera: Camera,
    pub cube: ObjectId,
    pub target: Shared<RenderTarget>,
}

pub fn offscreen() -> OffscreenScene {
    let mut scene = Scene::new();
    let material = shared(lit([0.3, 0.8, 0.5, 1.0]));
    let cube = scene
        .add(Node::with_mesh(Mesh::new(shared(cube(1.4)), material)).named("offscreen cube"))
        .id();

    let mut camera = Camera::perspective(45f32.to_radians(), 1.0, 0.1, 50.0);
    camera.look_at(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, Vec3::Y);

    OffscreenScene {
        scene,
        camera,
        cube,
        target: shared(RenderTarget::new(OFFSCREEN_SIZE, OFFSCREEN_SIZE, 1)),
    }
}

pub fn main_scene(offscreen: &Shared<RenderTarget>) -> MainScene {
    let mut scene = Scene::new();

    let material = shared(lit([0.9, 0.45, 0.2, 1.0]));
    let cube = scene
        .add(Node::with_mesh(Mesh::new(shared(cube(1.5)), material)).named("cube"))
        .id();

    let glass = lit([0.3, 0.5, 1.0, 0.45]).with_transparent(true).with_side(Side::Both);
    scene.add(
        Node::with_mesh(Mesh::new(shared(lit_quad(1.6)), shared(glass)))
            .named("glass")
            .with_transform(Transform::from_translation(Vec3::new(0.6, 0.2, 1.4))),
    );

    let board = shared(checker(64, 8));
    scene.add(
        Node::with_mesh(Mesh::new(shared(textured_quad(2.0)), shared(textured(board))))
            .named("checker")
            .with_transform(Transform::from_translation(Vec3::new(-2.8, 0.0, -0.5))),
    );

    if let Some(panel) = offscreen.borrow().texture().cloned() {
        scene.add(
            Node::with_mesh(Mesh::new(shared(textured_quad(2.0)), shared(textured(panel))))
                .named("offscreen panel")
                .with_transform(Transform::from_translation(Vec3::new(2.8, 0.0, -0.5))),
        );
    }

    let mut camera = Camera::perspective(50f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
    camera.look_at(Vec3::new(0.0, 1.5, 6.5), Vec3::ZERO, Vec3::Y);

    MainScene { scene, camera, cube }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tessera_engine::device::HeadlessDevice;
    use tessera_engine::render::{Renderer, RendererConfig};

    #[test]
    fn cube_has_shared_corners_per_face() {
        let g = cube(2.0);
        assert_eq!(g.attribute(POSITION).map(|a| a.count()), Some(24));
        assert_eq!(g.index().map(|a| a.count()), Some(36));
    }

    #[test]
    fn demo_frames_render_headless() {
        let mut off = offscreen();
        let mut main = main_scene(&off.target);
        let mut r = Renderer::new(HeadlessDevice::new(640, 360), RendererConfig::default());

        for frame in 0..3 {
            let t = frame as f32 * 0.1;
            spin(&mut off.scene, off.cube, -t);
            spin(&mut main.scene, main.cube, t);

            r.set_render_target(Some(off.target.clone()));
            r.render(&mut off.scene, Some(&mut off.camera)).unwrap();
            r.set_render_target(None);
            r.render(&mut main.scene, Some(&mut main.camera)).unwrap();
        }

        let frames = r.device().frames();
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[0].draw_calls(), 1);
        assert_eq!(frames[1].draw_calls(), 4);
        // one pipeline per drawable, never rebuilt
        assert_eq!(r.device().stats().pipelines_created, 5);
    }
}
