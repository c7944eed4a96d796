//! Photon tracing.
//!
//! Photons leave the lights, bounce through the scene with Russian-roulette
//! decisions driven by the hit material, and are stored on diffuse hits.
//! Each photon path is followed with an explicit work list rather than
//! recursion.

use caustic_core::random::{gen_f32, sample_hemisphere_about};
use caustic_core::{Color, IntersectionState, Light, Scene};
use caustic_math::{reflect, refract, Ray, LARGE_EPSILON, SMALL_EPSILON};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::photon::{Photon, PhotonMap, PhotonMapBuilder};
use crate::settings::PhotonSettings;
use crate::stats::PhotonStats;
use crate::stream_seed;

/// Emission attempts allowed per requested caustic photon before a light
/// gives up looking for specular surfaces.
const CAUSTIC_ATTEMPTS_PER_PHOTON: usize = 64;

/// The map a pass fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotonMapKind {
    Diffuse,
    Caustic,
}

impl PhotonMapKind {
    fn seed_salt(self) -> u64 {
        match self {
            PhotonMapKind::Diffuse => 0x6469_6666,
            PhotonMapKind::Caustic => 0x6361_7573,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathEvent {
    Emitted,
    Diffuse,
    Specular,
}

/// One entry of the work list.
#[derive(Debug, Clone, Copy)]
struct PhotonPath {
    ray: Ray,
    energy: Color,
    last_event: PathEvent,
    bounced: bool,
    ior: f32,
    remaining_bounces: u32,
}

impl PhotonPath {
    fn continue_with(&self, ray: Ray, energy: Color, event: PathEvent, ior: f32) -> Self {
        Self {
            ray,
            energy,
            last_event: event,
            bounced: true,
            ior,
            remaining_bounces: self.remaining_bounces - 1,
        }
    }
}

/// Photons emitted from one light in one parallel batch.
#[derive(Debug, Clone, Copy)]
struct EmissionBatch {
    light: usize,
    photons: usize,
    energy: Color,
    seed: u64,
}

/// Both photon maps, frozen, with the statistics of their passes.
pub struct PhotonMaps {
    pub diffuse: PhotonMap,
    pub caustic: PhotonMap,
    pub diffuse_stats: PhotonStats,
    pub caustic_stats: PhotonStats,
}

impl PhotonMaps {
    pub fn empty() -> Self {
        Self {
            diffuse: PhotonMap::empty(),
            caustic: PhotonMap::empty(),
            diffuse_stats: PhotonStats::default(),
            caustic_stats: PhotonStats::default(),
        }
    }
}

/// Traces photons through a built scene.
pub struct PhotonTracer<'s> {
    scene: &'s Scene,
    max_bounces: u32,
    include_direct: bool,
    batch_size: usize,
}

impl<'s> PhotonTracer<'s> {
    pub fn new(scene: &'s Scene, settings: &PhotonSettings) -> Self {
        Self {
            scene,
            max_bounces: settings.max_photon_bounces,
            include_direct: settings.stores_direct_photons(),
            batch_size: settings.batch_size.max(1),
        }
    }

    /// Run the diffuse and caustic passes and freeze both maps.
    pub fn build_maps(&self, settings: &PhotonSettings) -> PhotonMaps {
        let (diffuse, diffuse_stats) = self.trace_pass(
            PhotonMapKind::Diffuse,
            settings.diffuse_photons,
            settings.diffuse_emission_scale,
            settings.seed,
        );

        let (caustic, caustic_stats) = if self.scene_has_specular_surfaces() {
            self.trace_pass(
                PhotonMapKind::Caustic,
                settings.caustic_photons,
                settings.caustic_emission_scale,
                settings.seed,
            )
        } else {
            log::info!("No reflective or refractive surfaces, skipping caustic photons");
            (PhotonMapBuilder::new(), PhotonStats::default())
        };

        PhotonMaps {
            diffuse: diffuse.optimise(),
            caustic: caustic.optimise(),
            diffuse_stats,
            caustic_stats,
        }
    }

    /// Split `total` photons across the lights in proportion to the length
    /// of their color. Lights without intensity get none.
    pub fn light_photon_counts(&self, total: usize) -> Vec<usize> {
        let intensities: Vec<f32> = self
            .scene
            .lights()
            .iter()
            .map(|light| light.light_color().length())
            .collect();
        let sum: f32 = intensities.iter().sum();
        if total == 0 || sum <= SMALL_EPSILON {
            return vec![0; intensities.len()];
        }
        intensities
            .iter()
            .map(|intensity| (total as f64 * (*intensity / sum) as f64) as usize)
            .collect()
    }

    /// Emit `total` photons and keep the deposits that belong to `kind`.
    ///
    /// Batches are traced in parallel, each with its own generator seeded
    /// from `seed` and the batch index, then merged in batch order.
    pub fn trace_pass(
        &self,
        kind: PhotonMapKind,
        total: usize,
        emission_scale: f32,
        seed: u64,
    ) -> (PhotonMapBuilder, PhotonStats) {
        let mut batches = Vec::new();
        for (light_index, count) in self.light_photon_counts(total).into_iter().enumerate() {
            if count == 0 {
                continue;
            }
            let color = self.scene.lights()[light_index].light_color();
            let energy = color * emission_scale / count as f32;
            let mut remaining = count;
            while remaining > 0 {
                let photons = remaining.min(self.batch_size);
                let stream = batches.len() as u64;
                batches.push(EmissionBatch {
                    light: light_index,
                    photons,
                    energy,
                    seed: stream_seed(seed ^ kind.seed_salt(), stream),
                });
                remaining -= photons;
            }
        }

        let results: Vec<(PhotonMapBuilder, PhotonStats)> = batches
            .par_iter()
            .map(|batch| self.trace_batch(kind, batch))
            .collect();

        let mut builder = PhotonMapBuilder::new();
        let mut stats = PhotonStats::default();
        for (partial, partial_stats) in results {
            builder.append(partial);
            stats.merge(&partial_stats);
        }

        log::info!(
            "{:?} photon pass: {} emitted, {} stored, {} absorbed, {} escaped, {} rejected",
            kind,
            stats.emitted,
            stats.stored,
            stats.absorbed,
            stats.escaped,
            stats.rejected
        );
        (builder, stats)
    }

    fn trace_batch(&self, kind: PhotonMapKind, batch: &EmissionBatch) -> (PhotonMapBuilder, PhotonStats) {
        let mut rng = StdRng::seed_from_u64(batch.seed);
        let light: &dyn Light = self.scene.lights()[batch.light].as_ref();
        let mut builder = PhotonMapBuilder::new();
        let mut stats = PhotonStats::default();

        let max_attempts = match kind {
            PhotonMapKind::Diffuse => usize::MAX,
            PhotonMapKind::Caustic => batch.photons.saturating_mul(CAUSTIC_ATTEMPTS_PER_PHOTON),
        };

        let mut accepted = 0;
        let mut attempts = 0;
        while accepted < batch.photons && attempts < max_attempts {
            attempts += 1;
            let ray = light.generate_random_photon_ray(&mut rng);
            if kind == PhotonMapKind::Caustic && !self.first_hit_is_specular(&ray) {
                stats.rejected += 1;
                continue;
            }
            accepted += 1;
            stats.emitted += 1;
            stats.emitted_energy += batch.energy;

            let path = PhotonPath {
                ray,
                energy: batch.energy,
                last_event: PathEvent::Emitted,
                bounced: false,
                ior: 1.0,
                remaining_bounces: self.max_bounces,
            };
            self.trace_photon(kind, path, &mut rng, &mut builder, &mut stats);
        }

        if accepted < batch.photons {
            log::warn!(
                "Light {} found only {} of {} caustic photons",
                batch.light,
                accepted,
                batch.photons
            );
        }

        // Rejected draws are still emitted light. Spread this batch's share
        // of the light over every draw, not just the accepted ones.
        if stats.rejected > 0 {
            let share = batch.photons as f32 / attempts as f32;
            builder.scale_energy(share);
            stats.emitted_energy *= share;
            stats.stored_energy *= share;
        }
        (builder, stats)
    }

    fn first_hit_is_specular(&self, ray: &Ray) -> bool {
        let mut state = IntersectionState::new(0, 0);
        if !self.scene.trace(ray, &mut state) {
            return false;
        }
        state
            .material()
            .is_some_and(|m| m.transmittance() + m.reflectivity() >= LARGE_EPSILON)
    }

    fn trace_photon(
        &self,
        kind: PhotonMapKind,
        start: PhotonPath,
        rng: &mut dyn RngCore,
        map: &mut PhotonMapBuilder,
        stats: &mut PhotonStats,
    ) {
        let mut work = vec![start];
        while let Some(path) = work.pop() {
            let mut state = IntersectionState::new(0, 0);
            state.current_ior = path.ior;
            if !self.scene.trace(&path.ray, &mut state) {
                stats.escaped += 1;
                continue;
            }
            let Some(material) = state.material() else {
                continue;
            };

            let point = state.intersection_point();
            let normal = state.front_facing_normal();
            let direction = path.ray.direction().normalize();
            let transmittance = material.transmittance();
            let reflectivity = material.reflectivity();

            let u = gen_f32(rng);
            let continuation = if transmittance + reflectivity >= SMALL_EPSILON && u < transmittance {
                let n2 = if state.is_front_face() { material.ior() } else { 1.0 };
                match refract(direction, normal, path.ior, n2) {
                    Some(refracted) => Some((
                        Ray::new(point - normal * LARGE_EPSILON, refracted),
                        path.energy,
                        PathEvent::Specular,
                        n2,
                    )),
                    // Total internal reflection keeps the photon in its medium
                    None => Some((
                        Ray::new(point + normal * LARGE_EPSILON, reflect(direction, normal)),
                        path.energy,
                        PathEvent::Specular,
                        path.ior,
                    )),
                }
            } else if u < transmittance + reflectivity {
                Some((
                    Ray::new(point + normal * LARGE_EPSILON, reflect(direction, normal)),
                    path.energy,
                    PathEvent::Specular,
                    path.ior,
                ))
            } else {
                let target = if path.last_event == PathEvent::Specular {
                    PhotonMapKind::Caustic
                } else {
                    PhotonMapKind::Diffuse
                };
                if target == kind && (path.bounced || self.include_direct) {
                    map.insert(Photon {
                        position: point + normal * LARGE_EPSILON,
                        normal,
                        energy: path.energy,
                        to_light_ray: Ray::new(point, -direction),
                    });
                    stats.stored += 1;
                    stats.stored_energy += path.energy;
                }

                let diffuse = material.base_diffuse_reflection();
                let specular = material.base_specular_reflection();
                let total = diffuse + specular;
                let survival = total.max_element().min(1.0);
                let sum = total.element_sum();
                let pd = if sum > SMALL_EPSILON {
                    diffuse.element_sum() * survival / sum
                } else {
                    0.0
                };

                // The specular lobe is left to direct lighting, so only the
                // diffuse share continues.
                if pd > SMALL_EPSILON && gen_f32(rng) < pd {
                    let bounce = sample_hemisphere_about(normal, rng);
                    Some((
                        Ray::new(point + normal * LARGE_EPSILON, bounce),
                        path.energy * diffuse / pd,
                        PathEvent::Diffuse,
                        path.ior,
                    ))
                } else {
                    stats.absorbed += 1;
                    None
                }
            };

            let Some((ray, energy, event, ior)) = continuation else {
                continue;
            };
            if path.remaining_bounces == 0 {
                stats.bounce_limited += 1;
                continue;
            }
            work.push(path.continue_with(ray, energy, event, ior));
        }
    }

    fn scene_has_specular_surfaces(&self) -> bool {
        self.scene
            .nodes()
            .iter()
            .flat_map(|node| node.meshes())
            .any(|mesh| {
                let material = mesh.material();
                material.transmittance() + material.reflectivity() >= LARGE_EPSILON
            })
    }
}
