//! Render and photon-tracing settings.
//!
//! Both structs deserialize with every field optional so a JSON config only
//! needs to name what it changes.

use caustic_core::Color;
use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::gather::FilterKernel;

/// Settings for the pixel sampling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Upper bound on camera samples per pixel
    pub max_samples_per_pixel: u32,
    /// Samples taken before adaptive sampling may stop early
    pub min_samples_per_pixel: u32,
    pub adaptive_sampling: bool,
    /// Luminance variance below which a pixel is considered converged
    pub adaptive_coefficient: f32,
    pub max_reflection_bounces: i32,
    pub max_refraction_bounces: i32,
    /// Worker threads; 0 uses one per available core
    pub threads: usize,
    pub seed: u64,
    /// Color of primary rays that hit nothing
    pub background: Color,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            max_samples_per_pixel: 1,
            min_samples_per_pixel: 1,
            adaptive_sampling: false,
            adaptive_coefficient: 0.01,
            max_reflection_bounces: 2,
            max_refraction_bounces: 4,
            threads: 0,
            seed: 0,
            background: Color::ZERO,
        }
    }
}

impl RenderSettings {
    pub fn resolution(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Settings for photon map construction and radiance estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotonSettings {
    /// Photons emitted for the diffuse (global) map
    pub diffuse_photons: usize,
    /// Photons that must reach a specular surface first, for the caustic map
    pub caustic_photons: usize,
    /// Bounces a photon may make before it is dropped
    pub max_photon_bounces: u32,
    pub diffuse_emission_scale: f32,
    pub caustic_emission_scale: f32,
    pub diffuse_radius: f32,
    pub caustic_radius: f32,
    pub diffuse_filter: FilterKernel,
    pub caustic_filter: FilterKernel,
    /// Weight of the caustic estimate in the final color
    pub caustic_contribution: f32,
    /// Final gather rays per shading point; 0 estimates the diffuse map directly
    pub gather_samples: u32,
    /// Also store photons on their first (direct) diffuse hit when the
    /// diffuse map is estimated at the shading point. Final gather always
    /// stores them; see [`PhotonSettings::stores_direct_photons`].
    pub include_direct: bool,
    /// Photons traced per parallel batch
    pub batch_size: usize,
    pub seed: u64,
}

impl Default for PhotonSettings {
    fn default() -> Self {
        Self {
            diffuse_photons: 300_000,
            caustic_photons: 600_000,
            max_photon_bounces: 10,
            diffuse_emission_scale: 36.0,
            caustic_emission_scale: 1.0,
            diffuse_radius: 0.03,
            caustic_radius: 0.02,
            diffuse_filter: FilterKernel::Uniform,
            caustic_filter: FilterKernel::default(),
            caustic_contribution: 0.18,
            gather_samples: 96,
            include_direct: false,
            batch_size: 4096,
            seed: 0,
        }
    }
}

impl PhotonSettings {
    /// Settings that emit no photons at all.
    pub fn disabled() -> Self {
        Self {
            diffuse_photons: 0,
            caustic_photons: 0,
            ..Self::default()
        }
    }

    /// Whether the diffuse pass keeps first-hit deposits.
    ///
    /// Final gather estimates the map where its rays land, so it needs the
    /// photons that came straight from a light. Estimating at the shading
    /// point only wants bounced photons unless `include_direct` asks for
    /// more, since shadow rays already cover direct light there.
    pub fn stores_direct_photons(&self) -> bool {
        self.gather_samples > 0 || self.include_direct
    }
}
