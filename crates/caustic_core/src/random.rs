//! Random sampling helpers shared by lights, the photon tracer and the renderers.
//!
//! Every function takes the caller's generator; nothing here owns or seeds one.

use std::f32::consts::PI;

use caustic_math::{Vec3, LARGE_EPSILON};
use rand::{Rng, RngCore};

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Uniformly distributed direction on the unit sphere (rejection sampling).
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let v = Vec3::new(
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-6 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

/// Cosine-weighted direction on the +Z hemisphere.
pub fn sample_cosine_hemisphere(rng: &mut dyn RngCore) -> Vec3 {
    let u = gen_f32(rng);
    let r = u.sqrt();
    let theta = 2.0 * PI * gen_f32(rng);
    Vec3::new(r * theta.cos(), r * theta.sin(), (1.0 - u).max(0.0).sqrt())
}

/// Orthonormal tangent and bitangent for `normal`.
///
/// Starts from the X axis and switches to Y when the normal is nearly
/// parallel to it.
pub fn tangent_frame(normal: Vec3) -> (Vec3, Vec3) {
    let normal = normal.normalize();
    let mut helper = Vec3::X;
    if (1.0 - normal.dot(helper).abs()).abs() <= 10_000.0 * LARGE_EPSILON * LARGE_EPSILON {
        helper = Vec3::Y;
    }
    let tangent = normal.cross(helper).normalize();
    let bitangent = normal.cross(tangent).normalize();
    (tangent, bitangent)
}

/// Cosine-weighted direction on the hemisphere around `normal`.
pub fn sample_hemisphere_about(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let (tangent, bitangent) = tangent_frame(normal);
    let local = sample_cosine_hemisphere(rng);
    (tangent * local.x + bitangent * local.y + normal.normalize() * local.z).normalize()
}
