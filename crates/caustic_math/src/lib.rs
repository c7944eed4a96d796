//! Caustic math types.
//!
//! Thin layer over glam with the handful of geometric types the ray
//! tracer shares between crates: intervals, bounding boxes and rays.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{reflect, refract, Ray};
pub use transform::Mat4Ext;

/// Tolerance for comparisons against zero (lengths, probabilities, dot products).
pub const SMALL_EPSILON: f32 = 1e-6;

/// Offset used to push ray origins and photon positions off a surface.
pub const LARGE_EPSILON: f32 = 1e-4;

/// Returns the luminance of a linear RGB color.
#[inline]
pub fn luminance(color: Vec3) -> f32 {
    color.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_of_white_is_one() {
        assert!((luminance(Vec3::ONE) - 1.0).abs() < 1e-5);
        assert_eq!(luminance(Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_epsilon_ordering() {
        assert!(SMALL_EPSILON < LARGE_EPSILON);
    }
}
