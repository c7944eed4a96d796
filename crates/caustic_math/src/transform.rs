// Transform utilities for Mat4
//
// glam already provides transform_point3() / transform_vector3(); scene objects
// also need normals carried through non-uniform scales.

use glam::{Mat3, Mat4, Vec3};

/// Extension trait for Mat4 used when baking object transforms into meshes.
pub trait Mat4Ext {
    /// Transform a surface normal (inverse-transpose of the upper 3x3).
    ///
    /// The result is normalized. Singular matrices leave the normal unchanged.
    fn transform_normal(&self, normal: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        let linear = Mat3::from_mat4(*self);
        if linear.determinant().abs() < f32::EPSILON {
            return normal;
        }
        let transformed = linear.inverse().transpose() * normal;
        transformed.try_normalize().unwrap_or(normal)
    }
}
