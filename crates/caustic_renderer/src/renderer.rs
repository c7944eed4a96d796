//! Per-sample shading.
//!
//! [`BackwardRenderer`] evaluates direct lighting and follows mirror and
//! refraction rays while the intersection's bounce budgets allow.
//! [`PhotonMappingRenderer`] shades the same way and adds the indirect light
//! reconstructed from its photon maps.

use std::sync::Arc;

use caustic_core::random::sample_hemisphere_about;
use caustic_core::{Color, IntersectionState, Material, Scene};
use caustic_math::{reflect, refract, Ray, Vec3, LARGE_EPSILON, SMALL_EPSILON};
use rand::RngCore;

use crate::gather::density_estimate;
use crate::photon::PhotonMap;
use crate::sampler::ColorSampler;
use crate::settings::PhotonSettings;
use crate::stats::PhotonStats;
use crate::tracer::{PhotonMaps, PhotonTracer};

/// Computes the color of one camera sample.
pub trait Renderer: Send + Sync {
    /// One-time preparation before the pixel loop starts.
    fn initialize_renderer(&mut self) {}

    /// Color seen along `from_camera`, whose nearest hit is `state`.
    fn compute_sample_color(
        &self,
        state: &IntersectionState,
        from_camera: &Ray,
        rng: &mut dyn RngCore,
    ) -> Color;

    fn scene(&self) -> &Scene;

    fn sampler(&self) -> &dyn ColorSampler;
}

/// Direct lighting plus specular recursion.
pub struct BackwardRenderer {
    scene: Arc<Scene>,
    sampler: Arc<dyn ColorSampler>,
}

impl BackwardRenderer {
    pub fn new(scene: Arc<Scene>, sampler: Arc<dyn ColorSampler>) -> Self {
        Self { scene, sampler }
    }

    /// Shade a hit, adding `extra(state, ray, rng)` to the local term of
    /// every surface reached, including those seen through reflections.
    pub(crate) fn shade_with<F>(
        &self,
        state: &IntersectionState,
        from_camera: &Ray,
        rng: &mut dyn RngCore,
        extra: &F,
    ) -> Color
    where
        F: Fn(&IntersectionState, &Ray, &mut dyn RngCore) -> Color,
    {
        if !state.has_intersection {
            return Color::ZERO;
        }
        let Some(material) = state.material() else {
            return Color::ZERO;
        };

        let point = state.intersection_point();
        let normal = state.front_facing_normal();
        let direction = from_camera.direction().normalize();

        let mut local = material.ambient();
        local += self.direct_lighting(state, material, point, normal, from_camera);
        local += extra(state, from_camera, rng);

        let reflectivity = material.reflectivity();
        let transmittance = material.transmittance();
        let mut color = (1.0 - reflectivity - transmittance).max(0.0) * local;

        if reflectivity > SMALL_EPSILON && state.remaining_reflection_bounces > 0 {
            let ray = Ray::new(point + normal * LARGE_EPSILON, reflect(direction, normal));
            let mut next = IntersectionState::new(
                state.remaining_reflection_bounces - 1,
                state.remaining_refraction_bounces,
            );
            next.current_ior = state.current_ior;
            color += reflectivity * self.trace_secondary(&ray, &mut next, rng, extra);
        }

        if transmittance > SMALL_EPSILON && state.remaining_refraction_bounces > 0 {
            let n1 = state.current_ior;
            let n2 = if state.is_front_face() { material.ior() } else { 1.0 };
            let mut next = IntersectionState::new(
                state.remaining_reflection_bounces,
                state.remaining_refraction_bounces - 1,
            );
            let ray = match refract(direction, normal, n1, n2) {
                Some(refracted) => {
                    next.current_ior = n2;
                    Ray::new(point - normal * LARGE_EPSILON, refracted)
                }
                None => {
                    // Total internal reflection
                    next.current_ior = n1;
                    Ray::new(point + normal * LARGE_EPSILON, reflect(direction, normal))
                }
            };
            color += transmittance * self.trace_secondary(&ray, &mut next, rng, extra);
        }

        color
    }

    fn trace_secondary<'s, F>(
        &'s self,
        ray: &Ray,
        state: &mut IntersectionState<'s>,
        rng: &mut dyn RngCore,
        extra: &F,
    ) -> Color
    where
        F: Fn(&IntersectionState, &Ray, &mut dyn RngCore) -> Color,
    {
        if self.scene.trace(ray, state) {
            self.shade_with(state, ray, rng, extra)
        } else {
            Color::ZERO
        }
    }

    /// Sum of every light's contribution that reaches `point` unoccluded.
    fn direct_lighting(
        &self,
        state: &IntersectionState,
        material: &dyn Material,
        point: Vec3,
        normal: Vec3,
        from_camera: &Ray,
    ) -> Color {
        let mut total = Color::ZERO;
        let mut sample_rays = Vec::new();
        for light in self.scene.lights() {
            sample_rays.clear();
            light.compute_sample_rays(point, normal, &mut sample_rays);
            if sample_rays.is_empty() {
                continue;
            }

            let radiance = light.light_color() * light.compute_light_attenuation(point);
            let mut sum = Color::ZERO;
            for shadow_ray in &sample_rays {
                let mut occluder = IntersectionState::new(0, 0);
                if self.scene.trace(shadow_ray, &mut occluder) {
                    continue;
                }
                sum += material.compute_brdf(state, radiance, shadow_ray, from_camera);
            }
            total += sum / sample_rays.len() as f32;
        }
        total
    }
}

fn no_extra(_: &IntersectionState, _: &Ray, _: &mut dyn RngCore) -> Color {
    Color::ZERO
}

impl Renderer for BackwardRenderer {
    fn compute_sample_color(
        &self,
        state: &IntersectionState,
        from_camera: &Ray,
        rng: &mut dyn RngCore,
    ) -> Color {
        self.shade_with(state, from_camera, rng, &no_extra)
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn sampler(&self) -> &dyn ColorSampler {
        self.sampler.as_ref()
    }
}

/// Backward ray tracing plus photon map density estimates.
///
/// The maps are empty until [`Renderer::initialize_renderer`] runs.
pub struct PhotonMappingRenderer {
    backward: BackwardRenderer,
    settings: PhotonSettings,
    maps: PhotonMaps,
}

impl PhotonMappingRenderer {
    pub fn new(scene: Arc<Scene>, sampler: Arc<dyn ColorSampler>, settings: PhotonSettings) -> Self {
        Self {
            backward: BackwardRenderer::new(scene, sampler),
            settings,
            maps: PhotonMaps::empty(),
        }
    }

    pub fn settings(&self) -> &PhotonSettings {
        &self.settings
    }

    pub fn diffuse_map(&self) -> &PhotonMap {
        &self.maps.diffuse
    }

    pub fn caustic_map(&self) -> &PhotonMap {
        &self.maps.caustic
    }

    pub fn diffuse_stats(&self) -> &PhotonStats {
        &self.maps.diffuse_stats
    }

    pub fn caustic_stats(&self) -> &PhotonStats {
        &self.maps.caustic_stats
    }

    /// Photon map radiance at a hit. Empty maps add exactly zero and draw
    /// no random numbers.
    fn indirect(&self, state: &IntersectionState, from_camera: &Ray, rng: &mut dyn RngCore) -> Color {
        let settings = &self.settings;
        let mut indirect = Color::ZERO;

        if !self.maps.caustic.is_empty() {
            indirect += settings.caustic_contribution
                * density_estimate(
                    &self.maps.caustic,
                    state,
                    from_camera,
                    settings.caustic_radius,
                    settings.caustic_filter,
                );
        }

        if !self.maps.diffuse.is_empty() {
            indirect += if settings.gather_samples == 0 {
                density_estimate(
                    &self.maps.diffuse,
                    state,
                    from_camera,
                    settings.diffuse_radius,
                    settings.diffuse_filter,
                )
            } else {
                self.final_gather(state, from_camera, rng)
            };
        }

        indirect
    }

    /// Average of the diffuse map estimated where cosine-distributed rays
    /// from the shading point land, reflected toward the camera. The ray
    /// distribution already carries the cosine, so the BRDF is evaluated
    /// without it.
    fn final_gather(&self, state: &IntersectionState, from_camera: &Ray, rng: &mut dyn RngCore) -> Color {
        let Some(material) = state.material() else {
            return Color::ZERO;
        };
        let point = state.intersection_point();
        let normal = state.front_facing_normal();
        let samples = self.settings.gather_samples;

        let mut sum = Color::ZERO;
        for _ in 0..samples {
            let direction = sample_hemisphere_about(normal, rng);
            let sample_ray = Ray::new(point + normal * LARGE_EPSILON, direction);
            let mut hit = IntersectionState::new(0, 0);
            if !self.backward.scene.trace(&sample_ray, &mut hit) {
                continue;
            }
            let radiance = density_estimate(
                &self.maps.diffuse,
                &hit,
                &sample_ray,
                self.settings.diffuse_radius,
                self.settings.diffuse_filter,
            );
            if radiance == Color::ZERO {
                continue;
            }
            sum += material.compute_cosine_sampled_brdf(state, radiance, &sample_ray, from_camera);
        }
        sum / samples as f32
    }
}

impl Renderer for PhotonMappingRenderer {
    fn initialize_renderer(&mut self) {
        let maps = PhotonTracer::new(&self.backward.scene, &self.settings).build_maps(&self.settings);
        log::info!(
            "Photon maps ready: {} diffuse, {} caustic",
            maps.diffuse.len(),
            maps.caustic.len()
        );
        self.maps = maps;
    }

    fn compute_sample_color(
        &self,
        state: &IntersectionState,
        from_camera: &Ray,
        rng: &mut dyn RngCore,
    ) -> Color {
        self.backward
            .shade_with(state, from_camera, rng, &|s: &IntersectionState, r: &Ray, g: &mut dyn RngCore| {
                self.indirect(s, r, g)
            })
    }

    fn scene(&self) -> &Scene {
        self.backward.scene()
    }

    fn sampler(&self) -> &dyn ColorSampler {
        self.backward.sampler()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::StratifiedSampler;
    use caustic_core::{BlinnPhongMaterial, MeshObject, PointLight, SceneBuilder, SceneObject};
    use glam::UVec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quad(name: &str, corners: [Vec3; 4], material: Arc<dyn Material>) -> SceneObject {
        let mut object = SceneObject::new(name);
        object.add_mesh_object(MeshObject::quad(name, corners, material));
        object
    }

    fn floor(material: Arc<dyn Material>) -> SceneObject {
        quad(
            "floor",
            [
                Vec3::new(-2.0, 0.0, 2.0),
                Vec3::new(2.0, 0.0, 2.0),
                Vec3::new(2.0, 0.0, -2.0),
                Vec3::new(-2.0, 0.0, -2.0),
            ],
            material,
        )
    }

    fn sampler() -> Arc<dyn ColorSampler> {
        Arc::new(StratifiedSampler::new(UVec2::ONE))
    }

    fn shade(renderer: &dyn Renderer, ray: &Ray, reflection: i32, refraction: i32) -> Color {
        let mut state = IntersectionState::new(reflection, refraction);
        let mut rng = StdRng::seed_from_u64(42);
        assert!(renderer.scene().trace(ray, &mut state));
        renderer.compute_sample_color(&state, ray, &mut rng)
    }

    #[test]
    fn test_direct_light_on_diffuse_floor() {
        let mut builder = SceneBuilder::new();
        builder.add_scene_object(floor(Arc::new(BlinnPhongMaterial::new(Color::splat(0.5)))));
        builder.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Color::ONE));
        let renderer = BackwardRenderer::new(Arc::new(builder.build().unwrap()), sampler());

        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0).normalize());
        let color = shade(&renderer, &ray, 0, 0);
        // Hit at the origin, light straight above: N.L = 1
        assert!((color - Color::splat(0.5)).length() < 1e-4, "got {color}");
    }

    #[test]
    fn test_occluded_light_gives_ambient_only() {
        let material = Arc::new(BlinnPhongMaterial::new(Color::splat(0.5)).with_ambient(Color::splat(0.1)));
        let mut builder = SceneBuilder::new();
        builder.add_scene_object(floor(material.clone()));
        builder.add_scene_object(quad(
            "blocker",
            [
                Vec3::new(-0.5, 0.5, 0.5),
                Vec3::new(0.5, 0.5, 0.5),
                Vec3::new(0.5, 0.5, -0.5),
                Vec3::new(-0.5, 0.5, -0.5),
            ],
            material,
        ));
        builder.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Color::ONE));
        let renderer = BackwardRenderer::new(Arc::new(builder.build().unwrap()), sampler());

        let ray = Ray::new(Vec3::new(0.0, 0.25, 2.0), Vec3::new(0.0, -0.25, -2.0).normalize());
        let color = shade(&renderer, &ray, 0, 0);
        assert!((color - Color::splat(0.1)).length() < 1e-5, "got {color}");
    }

    #[test]
    fn test_mirror_needs_reflection_budget() {
        let mirror: Arc<dyn Material> =
            Arc::new(BlinnPhongMaterial::new(Color::ZERO).with_reflectivity(1.0));
        let wall = Arc::new(BlinnPhongMaterial::new(Color::splat(0.8)).with_ambient(Color::splat(0.5)));
        let mut builder = SceneBuilder::new();
        builder.add_scene_object(floor(mirror));
        builder.add_scene_object(quad(
            "ceiling",
            [
                Vec3::new(-2.0, 2.0, -2.0),
                Vec3::new(2.0, 2.0, -2.0),
                Vec3::new(2.0, 2.0, 2.0),
                Vec3::new(-2.0, 2.0, 2.0),
            ],
            wall,
        ));
        let renderer = BackwardRenderer::new(Arc::new(builder.build().unwrap()), sampler());

        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.5), Vec3::new(0.0, -1.0, -0.5).normalize());
        assert_eq!(shade(&renderer, &ray, 0, 0), Color::ZERO);
        let reflected = shade(&renderer, &ray, 1, 0);
        assert!((reflected - Color::splat(0.5)).length() < 1e-5, "got {reflected}");
    }

    #[test]
    fn test_glass_at_grazing_angle_stays_finite() {
        let glass: Arc<dyn Material> = Arc::new(
            BlinnPhongMaterial::new(Color::ZERO)
                .with_transmittance(1.0)
                .with_ior(1.5),
        );
        let mut builder = SceneBuilder::new();
        builder.add_scene_object(floor(glass));
        builder.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Color::ONE));
        let renderer = BackwardRenderer::new(Arc::new(builder.build().unwrap()), sampler());

        // From below the surface, inside the denser medium
        let ray = Ray::new(Vec3::new(0.0, -0.1, 1.5), Vec3::new(0.0, 0.1, -1.5).normalize());
        let mut state = IntersectionState::new(2, 4);
        state.current_ior = 1.5;
        let mut rng = StdRng::seed_from_u64(42);
        assert!(renderer.scene().trace(&ray, &mut state));
        let color = renderer.compute_sample_color(&state, &ray, &mut rng);
        assert!(color.is_finite());
        assert!(color.cmpge(Color::ZERO).all());
    }

    #[test]
    fn test_photon_renderer_without_photons_matches_backward() {
        let mut builder = SceneBuilder::new();
        builder.add_scene_object(floor(Arc::new(BlinnPhongMaterial::new(Color::splat(0.5)))));
        builder.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Color::ONE));
        let scene = Arc::new(builder.build().unwrap());

        let backward = BackwardRenderer::new(scene.clone(), sampler());
        let mut photon = PhotonMappingRenderer::new(scene, sampler(), PhotonSettings::disabled());
        photon.initialize_renderer();
        assert!(photon.diffuse_map().is_empty());
        assert!(photon.caustic_map().is_empty());

        let ray = Ray::new(Vec3::new(0.3, 1.0, 1.0), Vec3::new(-0.3, -1.0, -1.0).normalize());
        assert_eq!(shade(&photon, &ray, 2, 4), shade(&backward, &ray, 2, 4));
    }

    #[test]
    fn test_photon_renderer_adds_indirect_light() {
        let mut builder = SceneBuilder::new();
        builder.add_scene_object(floor(Arc::new(BlinnPhongMaterial::new(Color::splat(0.5)))));
        builder.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Color::ONE));
        let scene = Arc::new(builder.build().unwrap());

        let settings = PhotonSettings {
            diffuse_photons: 2000,
            caustic_photons: 0,
            diffuse_radius: 0.5,
            gather_samples: 0,
            include_direct: true,
            ..PhotonSettings::default()
        };
        let backward = BackwardRenderer::new(scene.clone(), sampler());
        let mut photon = PhotonMappingRenderer::new(scene, sampler(), settings);
        photon.initialize_renderer();
        assert!(!photon.diffuse_map().is_empty());

        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0).normalize());
        let with_photons = shade(&photon, &ray, 0, 0);
        let without = shade(&backward, &ray, 0, 0);
        assert!(with_photons.x > without.x, "{with_photons} vs {without}");
    }

    #[test]
    fn test_final_gather_picks_up_first_bounce_color_bleeding() {
        let mut builder = SceneBuilder::new();
        builder.add_scene_object(floor(Arc::new(BlinnPhongMaterial::new(Color::splat(0.7)))));
        builder.add_scene_object(quad(
            "red wall",
            [
                Vec3::new(1.0, 0.0, -2.0),
                Vec3::new(1.0, 0.0, 2.0),
                Vec3::new(1.0, 2.0, 2.0),
                Vec3::new(1.0, 2.0, -2.0),
            ],
            Arc::new(BlinnPhongMaterial::new(Color::new(0.8, 0.05, 0.05))),
        ));
        builder.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Color::ONE));
        let scene = Arc::new(builder.build().unwrap());

        let gather = PhotonSettings {
            diffuse_photons: 20_000,
            caustic_photons: 0,
            diffuse_radius: 0.2,
            gather_samples: 32,
            include_direct: false,
            ..PhotonSettings::default()
        };
        let estimate = PhotonSettings {
            gather_samples: 0,
            ..gather.clone()
        };
        let build = |settings: PhotonSettings| {
            let mut renderer = PhotonMappingRenderer::new(scene.clone(), sampler(), settings);
            renderer.initialize_renderer();
            renderer
        };
        let gathered = build(gather.clone());
        let gathered_with_direct = build(PhotonSettings {
            include_direct: true,
            ..gather
        });
        let estimated = build(estimate);
        let backward = BackwardRenderer::new(scene.clone(), sampler());

        // Light reaching the wall straight from the lamp is in the gathered map
        assert!(gathered.diffuse_stats().stored > estimated.diffuse_stats().stored);
        assert_eq!(gathered.diffuse_stats(), gathered_with_direct.diffuse_stats());

        // Floor point next to the red wall
        let ray = Ray::new(Vec3::new(0.7, 1.0, 1.0), Vec3::new(0.0, -1.0, -1.0).normalize());
        let direct = shade(&backward, &ray, 0, 0);
        let color = shade(&gathered, &ray, 0, 0);
        assert_eq!(color, shade(&gathered_with_direct, &ray, 0, 0));

        let bleed = |c: Color| c.x - c.y;
        assert!(bleed(direct).abs() < 1e-6);
        assert!(color.is_finite());
        assert!(bleed(color) > 0.01, "no red reached the floor: {color}");
    }
}
