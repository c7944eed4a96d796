//! Scene setup and the top-level ray trace.
//!
//! A scene is configured on a [`SceneBuilder`] and becomes traceable only
//! through [`SceneBuilder::build`], which bakes object transforms and
//! constructs every acceleration structure. The resulting [`Scene`] is
//! immutable and shared read-only between render threads.

use caustic_math::{Aabb, Interval, Mat4, Quat, Ray, Vec3, SMALL_EPSILON};

use crate::accel::{
    AccelerationConfig, AccelerationKind, AccelerationStructure, Accelerator, Traceable,
};
use crate::error::AccelResult;
use crate::intersection::IntersectionState;
use crate::light::Light;
use crate::mesh::{Mesh, MeshObject};

/// A group of meshes sharing one transform.
#[derive(Clone)]
pub struct SceneObject {
    name: String,
    meshes: Vec<MeshObject>,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    acceleration: AccelerationConfig,
    child_acceleration: AccelerationConfig,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meshes: Vec::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            acceleration: AccelerationConfig::default(),
            child_acceleration: AccelerationConfig::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_mesh_object(&mut self, mesh: MeshObject) -> &mut Self {
        self.meshes.push(mesh);
        self
    }

    pub fn add_mesh_objects(&mut self, meshes: impl IntoIterator<Item = MeshObject>) -> &mut Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn mesh_objects(&self) -> &[MeshObject] {
        &self.meshes
    }

    pub fn translate(&mut self, offset: Vec3) -> &mut Self {
        self.position += offset;
        self
    }

    /// Rotate by `angle` radians about `axis` (applied after earlier rotations).
    pub fn rotate(&mut self, axis: Vec3, angle: f32) -> &mut Self {
        if let Some(axis) = axis.try_normalize() {
            self.rotation = Quat::from_axis_angle(axis, angle) * self.rotation;
        }
        self
    }

    pub fn multiply_scale(&mut self, factor: Vec3) -> &mut Self {
        self.scale *= factor;
        self
    }

    /// Object-to-world matrix: scale, then rotate, then translate.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Request an acceleration structure over this object's meshes,
    /// replacing any earlier request.
    pub fn create_acceleration_data(&mut self, kind: AccelerationKind) -> &mut AccelerationConfig {
        self.acceleration = AccelerationConfig::new(kind);
        &mut self.acceleration
    }

    pub fn configure_acceleration_structure(
        &mut self,
        configure: impl FnOnce(&mut AccelerationConfig),
    ) -> &mut Self {
        configure(&mut self.acceleration);
        self
    }

    /// Request the structure each of this object's meshes builds over its
    /// own triangles.
    pub fn create_child_mesh_acceleration_data(
        &mut self,
        kind: AccelerationKind,
    ) -> &mut AccelerationConfig {
        self.child_acceleration = AccelerationConfig::new(kind);
        &mut self.child_acceleration
    }

    pub fn configure_child_mesh_acceleration_structure(
        &mut self,
        configure: impl FnOnce(&mut AccelerationConfig),
    ) -> &mut Self {
        configure(&mut self.child_acceleration);
        self
    }

    fn build(self) -> AccelResult<SceneNode> {
        let transform = self.transform();
        let meshes = self
            .meshes
            .into_iter()
            .map(|mesh| mesh.build(&transform, &self.child_acceleration))
            .collect::<AccelResult<Vec<Mesh>>>()?;

        let mesh_bounds: Vec<Aabb> = meshes.iter().map(Mesh::bounds).collect();
        let accel = AccelerationStructure::build(&self.acceleration, &mesh_bounds)?;

        Ok(SceneNode {
            name: self.name,
            meshes,
            accel,
        })
    }
}

/// A built scene object: world-space meshes plus their acceleration structure.
pub struct SceneNode {
    name: String,
    meshes: Vec<Mesh>,
    accel: AccelerationStructure,
}

impl SceneNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn bounds(&self) -> Aabb {
        self.accel.bounds()
    }

    pub fn trace<'a>(&'a self, ray: &Ray, ray_t: Interval, state: &mut IntersectionState<'a>) -> bool {
        self.accel.trace(self, ray, ray_t, state)
    }
}

impl Traceable for SceneNode {
    fn intersect_primitive<'a>(
        &'a self,
        index: usize,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        self.meshes[index].trace(ray, ray_t, state)
    }
}

impl Traceable for [SceneNode] {
    fn intersect_primitive<'a>(
        &'a self,
        index: usize,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        self[index].trace(ray, ray_t, state)
    }
}

/// Mutable scene description.
#[derive(Default)]
pub struct SceneBuilder {
    objects: Vec<SceneObject>,
    lights: Vec<Box<dyn Light>>,
    acceleration: Option<AccelerationConfig>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scene_object(&mut self, object: SceneObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    pub fn add_light(&mut self, light: impl Light + 'static) -> &mut Self {
        self.lights.push(Box::new(light));
        self
    }

    /// Request a scene-wide acceleration structure over the scene objects.
    ///
    /// Calling this again replaces the previous request.
    pub fn generate_acceleration_data(&mut self, kind: AccelerationKind) -> &mut AccelerationConfig {
        self.acceleration.insert(AccelerationConfig::new(kind))
    }

    /// Build every mesh, object and scene acceleration structure.
    pub fn build(self) -> AccelResult<Scene> {
        let nodes = self
            .objects
            .into_iter()
            .map(SceneObject::build)
            .collect::<AccelResult<Vec<SceneNode>>>()?;

        let accel = match &self.acceleration {
            Some(config) => {
                let bounds: Vec<Aabb> = nodes.iter().map(SceneNode::bounds).collect();
                Some(AccelerationStructure::build(config, &bounds)?)
            }
            None => None,
        };

        let scene = Scene {
            nodes,
            lights: self.lights,
            accel,
        };
        log::info!(
            "Built scene: {} objects, {} meshes, {} triangles, {} lights, scene acceleration {:?}",
            scene.nodes.len(),
            scene.mesh_count(),
            scene.triangle_count(),
            scene.lights.len(),
            scene.acceleration_kind()
        );
        Ok(scene)
    }
}

/// Immutable, traceable scene.
pub struct Scene {
    nodes: Vec<SceneNode>,
    lights: Vec<Box<dyn Light>>,
    accel: Option<AccelerationStructure>,
}

impl Scene {
    /// Find the nearest intersection along `ray`.
    ///
    /// Hits closer than [`SMALL_EPSILON`] or past the ray's maximum distance
    /// are ignored. On a miss `state.has_intersection` is false; the
    /// refraction and bounce context in `state` is left untouched.
    pub fn trace<'a>(&'a self, ray: &Ray, state: &mut IntersectionState<'a>) -> bool {
        state.has_intersection = false;
        state.intersected_primitive = None;
        state.intersection_t = f32::INFINITY;

        let ray_t = ray.t_range(SMALL_EPSILON);
        match &self.accel {
            Some(accel) => accel.trace(self.nodes.as_slice(), ray, ray_t, state),
            None => {
                let mut hit_anything = false;
                let mut closest = ray_t.max;
                for node in &self.nodes {
                    if node.trace(ray, Interval::new(ray_t.min, closest), state) {
                        hit_anything = true;
                        closest = state.intersection_t;
                    }
                }
                hit_anything
            }
        }
    }

    pub fn lights(&self) -> &[Box<dyn Light>] {
        &self.lights
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Kind of the scene-wide structure, if one was requested.
    pub fn acceleration_kind(&self) -> Option<AccelerationKind> {
        self.accel.as_ref().map(AccelerationStructure::kind)
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes
            .iter()
            .fold(Aabb::EMPTY, |acc, node| Aabb::surrounding(&acc, &node.bounds()))
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().map(|n| n.meshes().len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|n| n.meshes())
            .map(Mesh::triangle_count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccelError;
    use crate::light::PointLight;
    use crate::material::{BlinnPhongMaterial, Color, Material};
    use caustic_math::UVec3;
    use std::sync::Arc;

    fn quad_at(z: f32, name: &str) -> MeshObject {
        let material: Arc<dyn Material> = Arc::new(BlinnPhongMaterial::new(Color::splat(0.8)));
        MeshObject::quad(
            name,
            [
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(-1.0, 1.0, z),
            ],
            material,
        )
    }

    /// Stack of quads along -z, one object each, with the given acceleration
    /// kind at every level.
    fn stacked_scene(kind: AccelerationKind) -> Scene {
        let mut builder = SceneBuilder::new();
        for i in 0..6 {
            let mut object = SceneObject::new(format!("layer{i}"));
            object.add_mesh_object(quad_at(-2.0 - i as f32, &format!("quad{i}")));
            object.create_acceleration_data(kind);
            object
                .create_child_mesh_acceleration_data(kind)
                .set_suggested_grid_size(UVec3::new(2, 2, 1));
            builder.add_scene_object(object);
        }
        builder
            .generate_acceleration_data(kind)
            .set_maximum_children(3)
            .set_nodes_on_leaves(1)
            .set_suggested_grid_size(UVec3::new(2, 2, 3));
        builder.add_light(PointLight::new(Vec3::new(0.0, 0.0, 5.0), Color::ONE));
        builder.build().unwrap()
    }

    const KINDS: [AccelerationKind; 3] = [
        AccelerationKind::None,
        AccelerationKind::UniformGrid,
        AccelerationKind::Bvh,
    ];

    #[test]
    fn test_every_variant_finds_the_same_nearest_triangle() {
        let ray = Ray::new(Vec3::new(0.3, -0.2, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let mut results = Vec::new();
        for kind in KINDS {
            let scene = stacked_scene(kind);
            assert_eq!(scene.acceleration_kind(), Some(kind));
            let mut state = IntersectionState::new(2, 4);
            assert!(scene.trace(&ray, &mut state));
            let primitive = state.intersected_primitive.unwrap();
            results.push((state.intersection_t, primitive.parent_mesh().name().to_string()));
        }
        for (t, name) in &results {
            assert!((t - 2.0).abs() < 1e-5);
            assert_eq!(name, "quad0");
        }
    }

    #[test]
    fn test_every_variant_misses_outside_bounds() {
        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        for kind in KINDS {
            let scene = stacked_scene(kind);
            let mut state = IntersectionState::default();
            assert!(!scene.trace(&ray, &mut state));
            assert!(!state.has_intersection);
        }
    }

    #[test]
    fn test_trace_respects_ray_max_distance() {
        let scene = stacked_scene(AccelerationKind::Bvh);
        let ray = Ray::with_max_distance(Vec3::ZERO, -Vec3::Z, 1.5);
        let mut state = IntersectionState::default();
        assert!(!scene.trace(&ray, &mut state));
    }

    #[test]
    fn test_scene_without_scene_acceleration_loops_objects() {
        let mut builder = SceneBuilder::new();
        let mut near = SceneObject::new("near");
        near.add_mesh_object(quad_at(-1.0, "near"));
        let mut far = SceneObject::new("far");
        far.add_mesh_object(quad_at(0.0, "far"));
        far.translate(Vec3::new(0.0, 0.0, -5.0));
        builder.add_scene_object(far).add_scene_object(near);
        let scene = builder.build().unwrap();

        assert_eq!(scene.acceleration_kind(), None);
        assert_eq!(scene.triangle_count(), 4);
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let mut state = IntersectionState::default();
        assert!(scene.trace(&ray, &mut state));
        assert!((state.intersection_t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_regenerating_acceleration_replaces_request() {
        let mut builder = SceneBuilder::new();
        builder
            .generate_acceleration_data(AccelerationKind::Bvh)
            .set_nodes_on_leaves(0);
        builder.generate_acceleration_data(AccelerationKind::None);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_bad_configuration_fails_build() {
        let mut builder = SceneBuilder::new();
        let mut object = SceneObject::new("bad");
        object.add_mesh_object(quad_at(-1.0, "quad"));
        object.configure_child_mesh_acceleration_structure(|config| {
            config
                .set_kind(AccelerationKind::UniformGrid)
                .set_suggested_grid_size(UVec3::ZERO);
        });
        builder.add_scene_object(object);
        assert!(matches!(builder.build(), Err(AccelError::InvalidGridSize(_))));
    }

    #[test]
    fn test_miss_clears_previous_hit() {
        let scene = stacked_scene(AccelerationKind::None);
        let mut state = IntersectionState::new(1, 1);
        state.current_ior = 1.5;
        assert!(scene.trace(&Ray::new(Vec3::ZERO, -Vec3::Z), &mut state));
        assert!(!scene.trace(&Ray::new(Vec3::ZERO, Vec3::Z), &mut state));
        assert!(state.intersected_primitive.is_none());
        assert_eq!(state.current_ior, 1.5);
    }
}
