//! Procedural Cornell box.
//!
//! A 2 x 2 x 2 room (y up, open towards +z) with a red left wall, a green
//! right wall and a point light just under the ceiling. The preset decides
//! what stands on the floor.

use std::sync::Arc;

use caustic_core::{
    AccelResult, AccelerationKind, BlinnPhongMaterial, Color, Material, MeshObject, PointLight, Scene,
    SceneBuilder, SceneObject,
};
use caustic_math::Vec3;
use caustic_renderer::PerspectiveCamera;
use clap::ValueEnum;

/// What stands inside the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenePreset {
    /// A glass block, for refracted caustics
    Glass,
    /// A mirror block
    Mirror,
    /// One of each
    Mixed,
}

fn wall(name: &str, corners: [Vec3; 4], material: Arc<dyn Material>) -> MeshObject {
    MeshObject::quad(name, corners, material)
}

/// Unit cube centred on the origin, outward-facing triangles.
fn cube(name: &str, material: Arc<dyn Material>) -> MeshObject {
    let positions = (0..8u32)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -0.5 } else { 0.5 },
                if i & 2 == 0 { -0.5 } else { 0.5 },
                if i & 4 == 0 { -0.5 } else { 0.5 },
            )
        })
        .collect();
    let faces: [[u32; 4]; 6] = [
        [0, 4, 6, 2], // -x
        [1, 3, 7, 5], // +x
        [0, 1, 5, 4], // -y
        [2, 6, 7, 3], // +y
        [0, 2, 3, 1], // -z
        [4, 5, 7, 6], // +z
    ];
    let triangles = faces
        .iter()
        .flat_map(|&[a, b, c, d]| [[a, b, c], [a, c, d]])
        .collect();
    MeshObject::new(name, positions, triangles, material)
}

fn room(white: Arc<dyn Material>) -> SceneObject {
    let red: Arc<dyn Material> = Arc::new(BlinnPhongMaterial::new(Color::new(0.63, 0.065, 0.05)));
    let green: Arc<dyn Material> = Arc::new(BlinnPhongMaterial::new(Color::new(0.14, 0.45, 0.091)));

    let mut room = SceneObject::new("room");
    room.add_mesh_objects([
        wall(
            "floor",
            [
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, -1.0),
            ],
            white.clone(),
        ),
        wall(
            "ceiling",
            [
                Vec3::new(-1.0, 2.0, -1.0),
                Vec3::new(1.0, 2.0, -1.0),
                Vec3::new(1.0, 2.0, 1.0),
                Vec3::new(-1.0, 2.0, 1.0),
            ],
            white.clone(),
        ),
        wall(
            "back",
            [
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 2.0, -1.0),
                Vec3::new(-1.0, 2.0, -1.0),
            ],
            white,
        ),
        wall(
            "left",
            [
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(-1.0, 2.0, -1.0),
                Vec3::new(-1.0, 2.0, 1.0),
            ],
            red,
        ),
        wall(
            "right",
            [
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 2.0, 1.0),
                Vec3::new(1.0, 2.0, -1.0),
            ],
            green,
        ),
    ]);
    room
}

fn block(name: &str, material: Arc<dyn Material>, size: Vec3, position: Vec3, angle: f32) -> SceneObject {
    let mut object = SceneObject::new(name);
    object.add_mesh_object(cube(name, material));
    object.create_child_mesh_acceleration_data(AccelerationKind::Bvh);
    object
        .multiply_scale(size)
        .rotate(Vec3::Y, angle.to_radians())
        .translate(position);
    object
}

/// Build the box for `preset`, indexing the scene with `acceleration`.
pub fn build_scene(preset: ScenePreset, acceleration: AccelerationKind) -> AccelResult<Scene> {
    let white: Arc<dyn Material> = Arc::new(
        BlinnPhongMaterial::new(Color::splat(0.73)).with_specular(Color::splat(0.1), 40.0),
    );
    let glass: Arc<dyn Material> = Arc::new(
        BlinnPhongMaterial::new(Color::splat(0.02))
            .with_specular(Color::splat(0.6), 40.0)
            .with_transmittance(0.8)
            .with_ior(1.5),
    );
    let mirror: Arc<dyn Material> = Arc::new(
        BlinnPhongMaterial::new(Color::splat(0.05))
            .with_specular(Color::splat(0.6), 40.0)
            .with_reflectivity(0.8),
    );

    let mut builder = SceneBuilder::new();
    builder.add_scene_object(room(white));
    match preset {
        ScenePreset::Glass => {
            builder.add_scene_object(block(
                "glass",
                glass,
                Vec3::new(0.6, 0.6, 0.6),
                Vec3::new(0.0, 0.3, 0.0),
                20.0,
            ));
        }
        ScenePreset::Mirror => {
            builder.add_scene_object(block(
                "mirror",
                mirror,
                Vec3::new(0.6, 1.2, 0.6),
                Vec3::new(0.0, 0.6, -0.2),
                -20.0,
            ));
        }
        ScenePreset::Mixed => {
            builder
                .add_scene_object(block(
                    "glass",
                    glass,
                    Vec3::new(0.55, 0.55, 0.55),
                    Vec3::new(0.4, 0.275, 0.3),
                    -18.0,
                ))
                .add_scene_object(block(
                    "mirror",
                    mirror,
                    Vec3::new(0.55, 1.1, 0.55),
                    Vec3::new(-0.4, 0.55, -0.35),
                    15.0,
                ));
        }
    }
    builder.add_light(PointLight::new(Vec3::new(0.0, 1.9, 0.0), Color::splat(1.0)));

    if acceleration != AccelerationKind::None {
        builder
            .generate_acceleration_data(acceleration)
            .set_maximum_children(2)
            .set_nodes_on_leaves(1);
    }
    builder.build()
}

/// Camera looking into the open side of the box.
pub fn camera(aspect_ratio: f32) -> PerspectiveCamera {
    PerspectiveCamera::new(aspect_ratio)
        .with_position(Vec3::new(0.0, 1.0, 3.4), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_vfov(40.0)
}
