//! Material trait for surface shading.

use caustic_math::{Ray, Vec3};

use crate::intersection::IntersectionState;

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Trait for materials that describe how light interacts with surfaces.
///
/// A material splits incoming energy three ways: `transmittance` goes
/// through the surface (refraction), `reflectivity` is mirrored, and the
/// remainder is shaded by the BRDF. The first two must sum to at most one.
pub trait Material: Send + Sync {
    /// Diffuse reflectance of the BRDF.
    fn base_diffuse_reflection(&self) -> Color;

    /// Specular reflectance of the BRDF.
    fn base_specular_reflection(&self) -> Color;

    /// Fraction of energy mirrored about the normal.
    fn reflectivity(&self) -> f32 {
        0.0
    }

    /// Fraction of energy refracted through the surface.
    fn transmittance(&self) -> f32 {
        0.0
    }

    /// Index of refraction of the material's interior.
    fn ior(&self) -> f32 {
        1.0
    }

    /// Light-independent term added once per shading point.
    fn ambient(&self) -> Color {
        Color::ZERO
    }

    /// Radiance reflected towards the camera for light of `incident_radiance`
    /// arriving along `to_light` (a ray from the surface towards the light).
    fn compute_brdf(
        &self,
        intersection: &IntersectionState,
        incident_radiance: Color,
        to_light: &Ray,
        from_camera: &Ray,
    ) -> Color;

    /// [`Material::compute_brdf`] for a `to_light` direction drawn from a
    /// cosine-weighted distribution, so N.L is left out of the diffuse lobe.
    fn compute_cosine_sampled_brdf(
        &self,
        intersection: &IntersectionState,
        incident_radiance: Color,
        to_light: &Ray,
        from_camera: &Ray,
    ) -> Color;
}

/// Blinn-Phong material with optional mirror reflection and refraction.
#[derive(Debug, Clone)]
pub struct BlinnPhongMaterial {
    diffuse: Color,
    specular: Color,
    shininess: f32,
    ambient: Color,
    reflectivity: f32,
    transmittance: f32,
    ior: f32,
}

impl BlinnPhongMaterial {
    /// Create a purely diffuse material.
    pub fn new(diffuse: Color) -> Self {
        Self {
            diffuse,
            specular: Color::ZERO,
            shininess: 1.0,
            ambient: Color::ZERO,
            reflectivity: 0.0,
            transmittance: 0.0,
            ior: 1.0,
        }
    }

    pub fn with_specular(mut self, specular: Color, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess.max(0.0);
        self
    }

    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    /// Set the mirror fraction. Transmittance is reduced if the two would
    /// exceed one.
    pub fn with_reflectivity(mut self, reflectivity: f32) -> Self {
        self.reflectivity = reflectivity.clamp(0.0, 1.0);
        if self.reflectivity + self.transmittance > 1.0 {
            log::warn!(
                "reflectivity {} + transmittance {} exceeds 1, clamping transmittance",
                self.reflectivity,
                self.transmittance
            );
            self.transmittance = 1.0 - self.reflectivity;
        }
        self
    }

    /// Set the refracted fraction, clamped so reflectivity + transmittance <= 1.
    pub fn with_transmittance(mut self, transmittance: f32) -> Self {
        let limit = 1.0 - self.reflectivity;
        if transmittance > limit {
            log::warn!(
                "transmittance {} exceeds the {} left by reflectivity, clamping",
                transmittance,
                limit
            );
        }
        self.transmittance = transmittance.clamp(0.0, limit);
        self
    }

    pub fn with_ior(mut self, ior: f32) -> Self {
        self.ior = ior;
        self
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }
}

impl Default for BlinnPhongMaterial {
    fn default() -> Self {
        Self::new(Color::splat(0.5))
    }
}

impl Material for BlinnPhongMaterial {
    fn base_diffuse_reflection(&self) -> Color {
        self.diffuse
    }

    fn base_specular_reflection(&self) -> Color {
        self.specular
    }

    fn reflectivity(&self) -> f32 {
        self.reflectivity
    }

    fn transmittance(&self) -> f32 {
        self.transmittance
    }

    fn ior(&self) -> f32 {
        self.ior
    }

    fn ambient(&self) -> Color {
        self.ambient
    }

    fn compute_brdf(
        &self,
        intersection: &IntersectionState,
        incident_radiance: Color,
        to_light: &Ray,
        from_camera: &Ray,
    ) -> Color {
        self.blinn_phong(intersection, incident_radiance, to_light, from_camera, true)
    }

    fn compute_cosine_sampled_brdf(
        &self,
        intersection: &IntersectionState,
        incident_radiance: Color,
        to_light: &Ray,
        from_camera: &Ray,
    ) -> Color {
        self.blinn_phong(intersection, incident_radiance, to_light, from_camera, false)
    }
}

impl BlinnPhongMaterial {
    fn blinn_phong(
        &self,
        intersection: &IntersectionState,
        incident_radiance: Color,
        to_light: &Ray,
        from_camera: &Ray,
        weight_by_cosine: bool,
    ) -> Color {
        let Some(to_viewer) = (-from_camera.direction()).try_normalize() else {
            return Color::ZERO;
        };
        let Some(to_light) = to_light.direction().try_normalize() else {
            return Color::ZERO;
        };

        // Shade the side of the surface the viewer is on.
        let mut normal = intersection.compute_normal();
        if normal.dot(to_viewer) < 0.0 {
            normal = -normal;
        }

        let n_dot_l = normal.dot(to_light);
        if n_dot_l <= 0.0 {
            return Color::ZERO;
        }

        let diffuse = if weight_by_cosine {
            self.diffuse * n_dot_l
        } else {
            self.diffuse
        };
        let specular = match (to_light + to_viewer).try_normalize() {
            Some(half) => self.specular * normal.dot(half).max(0.0).powf(self.shininess),
            None => Color::ZERO,
        };

        (diffuse + specular) * incident_radiance
    }
}
