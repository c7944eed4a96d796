//! Light sources.

use caustic_math::{Ray, Vec3, LARGE_EPSILON};
use rand::RngCore;

use crate::material::Color;
use crate::random::random_unit_vector;

/// A light that can be sampled for direct lighting and can emit photons.
pub trait Light: Send + Sync {
    fn position(&self) -> Vec3;

    /// Emitted color (radiant intensity per channel).
    fn light_color(&self) -> Color;

    /// Append shadow rays from a surface point towards the light.
    ///
    /// Each ray starts just off the surface along `normal` and is bounded by
    /// the distance to the light, so a hit means the light is occluded.
    fn compute_sample_rays(&self, origin: Vec3, normal: Vec3, output: &mut Vec<Ray>);

    /// Distance falloff applied to the light's color at `origin`.
    fn compute_light_attenuation(&self, _origin: Vec3) -> f32 {
        1.0
    }

    /// A ray leaving the light in a random direction, for photon emission.
    fn generate_random_photon_ray(&self, rng: &mut dyn RngCore) -> Ray;
}

/// Omnidirectional point light.
#[derive(Debug, Clone)]
pub struct PointLight {
    position: Vec3,
    color: Color,
}

impl PointLight {
    pub fn new(position: Vec3, color: Color) -> Self {
        Self { position, color }
    }
}

impl Light for PointLight {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn light_color(&self) -> Color {
        self.color
    }

    fn compute_sample_rays(&self, origin: Vec3, normal: Vec3, output: &mut Vec<Ray>) {
        let origin = origin + normal * LARGE_EPSILON;
        let to_light = self.position - origin;
        let distance = to_light.length();
        let Some(direction) = to_light.try_normalize() else {
            return;
        };
        output.push(Ray::with_max_distance(origin, direction, distance));
    }

    fn generate_random_photon_ray(&self, rng: &mut dyn RngCore) -> Ray {
        Ray::new(self.position, random_unit_vector(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_ray_is_bounded_by_light_distance() {
        let light = PointLight::new(Vec3::new(0.0, 2.0, 0.0), Color::ONE);
        let mut rays = Vec::new();
        light.compute_sample_rays(Vec3::ZERO, Vec3::Y, &mut rays);

        assert_eq!(rays.len(), 1);
        let ray = rays[0];
        assert!((ray.origin().y - LARGE_EPSILON).abs() < 1e-7);
        assert!((ray.direction() - Vec3::Y).length() < 1e-6);
        let max = ray.max_distance().unwrap();
        assert!((ray.at(max) - light.position()).length() < 1e-5);
    }

    #[test]
    fn test_photon_rays_start_at_light() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), Color::ONE);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let ray = light.generate_random_photon_ray(&mut rng);
            assert_eq!(ray.origin(), light.position());
            assert!((ray.direction().length() - 1.0).abs() < 1e-5);
        }
        assert_eq!(light.compute_light_attenuation(Vec3::ZERO), 1.0);
    }
}
