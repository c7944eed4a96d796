//! Triangle meshes.
//!
//! [`MeshObject`] is the editable description handed to a scene object;
//! [`Mesh`] is the built, world-space form with its own acceleration
//! structure over its triangles.

use std::sync::Arc;

use caustic_math::{Aabb, Interval, Mat4, Mat4Ext, Ray, Vec2, Vec3};

use crate::accel::{AccelerationConfig, AccelerationStructure, Accelerator, Traceable};
use crate::error::{AccelError, AccelResult};
use crate::intersection::{IntersectionState, PrimitiveRef};
use crate::material::Material;

/// Triangle mesh as authored, before it is placed in a scene.
#[derive(Clone)]
pub struct MeshObject {
    name: String,
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    triangles: Vec<[u32; 3]>,
    material: Arc<dyn Material>,
}

impl MeshObject {
    /// Create a mesh from positions and triangle vertex indices.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        triangles: Vec<[u32; 3]>,
        material: Arc<dyn Material>,
    ) -> Self {
        Self {
            name: name.into(),
            positions,
            normals: None,
            triangles,
            material,
        }
    }

    /// Attach per-vertex normals for smooth shading.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Two-triangle quad with corners in counter-clockwise order (seen from
    /// the side the normal points to).
    pub fn quad(name: impl Into<String>, corners: [Vec3; 4], material: Arc<dyn Material>) -> Self {
        Self::new(name, corners.to_vec(), vec![[0, 1, 2], [0, 2, 3]], material)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn set_material(&mut self, material: Arc<dyn Material>) {
        self.material = material;
    }

    /// Bake `transform` into the geometry and build the triangle index.
    pub(crate) fn build(self, transform: &Mat4, config: &AccelerationConfig) -> AccelResult<Mesh> {
        let count = self.positions.len();
        for triangle in &self.triangles {
            for &index in triangle {
                if index as usize >= count {
                    return Err(AccelError::InvalidVertexIndex {
                        mesh: self.name.clone(),
                        index,
                        count,
                    });
                }
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != count {
                return Err(AccelError::NormalCountMismatch {
                    mesh: self.name.clone(),
                    normals: normals.len(),
                    positions: count,
                });
            }
        }

        let positions: Vec<Vec3> = self
            .positions
            .iter()
            .map(|p| transform.transform_point3(*p))
            .collect();
        let normals = self.normals.map(|normals| {
            normals
                .iter()
                .map(|n| transform.transform_normal(*n))
                .collect::<Vec<_>>()
        });

        let face_normals: Vec<Vec3> = self
            .triangles
            .iter()
            .map(|[a, b, c]| {
                let (v0, v1, v2) = (
                    positions[*a as usize],
                    positions[*b as usize],
                    positions[*c as usize],
                );
                (v1 - v0).cross(v2 - v0).normalize_or_zero()
            })
            .collect();

        let triangle_bounds: Vec<Aabb> = self
            .triangles
            .iter()
            .map(|tri| Aabb::from_point_cloud(tri.iter().map(|&i| positions[i as usize])))
            .collect();

        let accel = AccelerationStructure::build(config, &triangle_bounds)?;
        let bounds = Aabb::from_point_cloud(positions.iter().copied());

        log::debug!(
            "Built mesh '{}': {} vertices, {} triangles, {:?}",
            self.name,
            count,
            self.triangles.len(),
            accel.kind()
        );

        Ok(Mesh {
            name: self.name,
            positions,
            normals,
            face_normals,
            triangles: self.triangles,
            material: self.material,
            bounds,
            accel,
        })
    }
}

/// World-space triangle mesh ready for tracing.
pub struct Mesh {
    name: String,
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    face_normals: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    material: Arc<dyn Material>,
    bounds: Aabb,
    accel: AccelerationStructure,
}

impl Mesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// World-space vertices of triangle `index`.
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Surface normal inside triangle `index` at barycentric `(u, v)`.
    ///
    /// Interpolates vertex normals when the mesh has them, otherwise returns
    /// the face normal.
    pub fn normal_at(&self, index: usize, barycentric: Vec2) -> Vec3 {
        let face = self.face_normals[index];
        let Some(normals) = &self.normals else {
            return face;
        };
        let [a, b, c] = self.triangles[index];
        let w = 1.0 - barycentric.x - barycentric.y;
        let n = normals[a as usize] * w
            + normals[b as usize] * barycentric.x
            + normals[c as usize] * barycentric.y;
        n.try_normalize().unwrap_or(face)
    }

    /// Nearest hit against this mesh's triangles.
    pub fn trace<'a>(&'a self, ray: &Ray, ray_t: Interval, state: &mut IntersectionState<'a>) -> bool {
        self.accel.trace(self, ray, ray_t, state)
    }
}

impl Traceable for Mesh {
    /// Möller-Trumbore ray-triangle intersection.
    fn intersect_primitive<'a>(
        &'a self,
        index: usize,
        ray: &Ray,
        ray_t: Interval,
        state: &mut IntersectionState<'a>,
    ) -> bool {
        let [v0, v1, v2] = self.triangle(index);
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin() - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return false;
        }

        state.record_hit(t, ray, PrimitiveRef::new(self, index), Vec2::new(u, v));
        true
    }
}
