//! Caustic Core - scene representation and ray/scene intersection.
//!
//! This crate provides:
//!
//! - **Scene types**: `MeshObject`, `SceneObject`, `SceneBuilder` and the
//!   immutable, traceable `Scene`
//! - **Acceleration structures**: linear scan, uniform grid and BVH behind a
//!   single `AccelerationStructure` enum
//! - **Shading capabilities**: the `Material` and `Light` traits with a
//!   Blinn-Phong material and a point light
//!
//! # Example
//!
//! ```ignore
//! use caustic_core::{AccelerationKind, SceneBuilder, SceneObject};
//!
//! let mut object = SceneObject::new("box");
//! object.add_mesh_objects(meshes);
//! object.create_acceleration_data(AccelerationKind::Bvh);
//!
//! let mut builder = SceneBuilder::new();
//! builder.add_scene_object(object);
//! builder.add_light(light);
//! let scene = builder.build()?;
//! ```

pub mod accel;
pub mod error;
pub mod intersection;
pub mod light;
pub mod material;
pub mod mesh;
pub mod random;
pub mod scene;

// Re-export commonly used types
pub use accel::{
    AccelerationConfig, AccelerationKind, AccelerationStructure, Accelerator, Traceable,
};
pub use error::{AccelError, AccelResult};
pub use intersection::{IntersectionState, PrimitiveRef};
pub use light::{Light, PointLight};
pub use material::{BlinnPhongMaterial, Color, Material};
pub use mesh::{Mesh, MeshObject};
pub use scene::{Scene, SceneBuilder, SceneNode, SceneObject};

pub use caustic_math::{Aabb, Interval, Ray, Vec3};
