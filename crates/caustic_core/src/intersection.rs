//! Intersection state filled in by scene traces.

use caustic_math::{Ray, Vec2, Vec3};

use crate::material::Material;
use crate::mesh::Mesh;

/// Reference to the triangle a ray hit.
///
/// Borrows the owning mesh, which is how the material is found; the
/// primitive never owns its parent.
#[derive(Clone, Copy)]
pub struct PrimitiveRef<'a> {
    mesh: &'a Mesh,
    triangle: usize,
}

impl<'a> PrimitiveRef<'a> {
    pub(crate) fn new(mesh: &'a Mesh, triangle: usize) -> Self {
        Self { mesh, triangle }
    }

    /// The mesh this triangle belongs to.
    pub fn parent_mesh(&self) -> &'a Mesh {
        self.mesh
    }

    pub fn triangle_index(&self) -> usize {
        self.triangle
    }
}

/// Record of the nearest ray-scene intersection.
///
/// Lives on the stack of a single trace call. Besides the hit itself it
/// carries the transport context that flows from bounce to bounce: the
/// refractive index of the medium the ray travels through and the
/// remaining reflection/refraction budgets.
#[derive(Clone)]
pub struct IntersectionState<'a> {
    /// Whether the last trace found anything
    pub has_intersection: bool,
    /// Ray parameter of the hit
    pub intersection_t: f32,
    /// The ray that produced the hit
    pub intersection_ray: Ray,
    /// Triangle that was hit
    pub intersected_primitive: Option<PrimitiveRef<'a>>,
    /// Barycentric (u, v) of the hit inside the triangle
    pub barycentric: Vec2,
    /// Index of refraction of the medium the ray is travelling in
    pub current_ior: f32,
    pub remaining_reflection_bounces: i32,
    pub remaining_refraction_bounces: i32,
}

impl<'a> IntersectionState<'a> {
    /// Fresh state with the given bounce budgets, travelling through air.
    pub fn new(max_reflection_bounces: i32, max_refraction_bounces: i32) -> Self {
        Self {
            has_intersection: false,
            intersection_t: f32::INFINITY,
            intersection_ray: Ray::default(),
            intersected_primitive: None,
            barycentric: Vec2::ZERO,
            current_ior: 1.0,
            remaining_reflection_bounces: max_reflection_bounces,
            remaining_refraction_bounces: max_refraction_bounces,
        }
    }

    /// Store a candidate hit. Callers only invoke this for hits closer than
    /// the current one (the search interval guarantees it).
    pub(crate) fn record_hit(&mut self, t: f32, ray: &Ray, primitive: PrimitiveRef<'a>, barycentric: Vec2) {
        self.has_intersection = true;
        self.intersection_t = t;
        self.intersection_ray = *ray;
        self.intersected_primitive = Some(primitive);
        self.barycentric = barycentric;
    }

    /// World-space hit position.
    pub fn intersection_point(&self) -> Vec3 {
        self.intersection_ray.at(self.intersection_t)
    }

    /// Interpolated surface normal at the hit, as authored on the mesh.
    ///
    /// Returns zero when there is no hit.
    pub fn compute_normal(&self) -> Vec3 {
        match (&self.intersected_primitive, self.has_intersection) {
            (Some(primitive), true) => primitive
                .parent_mesh()
                .normal_at(primitive.triangle_index(), self.barycentric),
            _ => Vec3::ZERO,
        }
    }

    /// Surface normal flipped, if needed, to face against the incoming ray.
    pub fn front_facing_normal(&self) -> Vec3 {
        let normal = self.compute_normal();
        if normal.dot(self.intersection_ray.direction()) > 0.0 {
            -normal
        } else {
            normal
        }
    }

    /// True if the ray arrived from the side the authored normal points to.
    pub fn is_front_face(&self) -> bool {
        self.compute_normal().dot(self.intersection_ray.direction()) <= 0.0
    }

    /// Material of the hit surface.
    pub fn material(&self) -> Option<&'a dyn Material> {
        if !self.has_intersection {
            return None;
        }
        self.intersected_primitive
            .map(|primitive| primitive.parent_mesh().material())
    }
}

impl Default for IntersectionState<'_> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
