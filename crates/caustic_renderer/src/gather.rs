//! Radiance estimation from photon maps.

use std::f32::consts::PI;

use caustic_core::{Color, IntersectionState};
use caustic_math::{Ray, LARGE_EPSILON, SMALL_EPSILON};
use serde::{Deserialize, Serialize};

use crate::photon::PhotonMap;

/// Photons whose normal deviates more than this from the shading normal
/// (as `| |n_p . n| - 1 |`) are ignored.
const NORMAL_TOLERANCE: f32 = 1000.0 * LARGE_EPSILON;

/// Distance weighting applied to photons inside the gather radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKernel {
    /// Every photon counts fully.
    Uniform,
    /// Linear falloff `(1 - k d / r)`, normalized by `1 - 2 / (3k)`.
    Cone { k: f32 },
    /// Jensen's Gaussian filter.
    Gaussian { alpha: f32, beta: f32 },
}

impl FilterKernel {
    pub fn cone() -> Self {
        FilterKernel::Cone { k: 1.0 }
    }

    pub fn gaussian() -> Self {
        FilterKernel::Gaussian {
            alpha: 0.918,
            beta: 1.953,
        }
    }

    /// Weight of a photon at `distance` from the shading point.
    ///
    /// Never negative; zero outside the radius.
    pub fn weight(&self, distance: f32, radius: f32) -> f32 {
        if radius <= 0.0 || distance > radius {
            return 0.0;
        }
        match *self {
            FilterKernel::Uniform => 1.0,
            FilterKernel::Cone { k } => {
                let falloff = (1.0 - k * distance / radius).max(0.0);
                let norm = 1.0 - 2.0 / (3.0 * k);
                if norm > SMALL_EPSILON {
                    falloff / norm
                } else {
                    falloff
                }
            }
            FilterKernel::Gaussian { alpha, beta } => {
                let denom = 1.0 - (-beta).exp();
                if denom.abs() < SMALL_EPSILON {
                    return alpha;
                }
                let d2 = distance * distance / (2.0 * radius * radius);
                (alpha * (1.0 - (1.0 - (-beta * d2).exp()) / denom)).max(0.0)
            }
        }
    }
}

impl Default for FilterKernel {
    fn default() -> Self {
        Self::cone()
    }
}

/// Reflected radiance at `intersection` towards `from_camera`, reconstructed
/// from the photons of `map` within `radius`.
///
/// Returns zero when there is no hit, no photons or a non-positive radius.
pub fn density_estimate(
    map: &PhotonMap,
    intersection: &IntersectionState,
    from_camera: &Ray,
    radius: f32,
    kernel: FilterKernel,
) -> Color {
    if !intersection.has_intersection || radius <= 0.0 || map.is_empty() {
        return Color::ZERO;
    }
    let Some(material) = intersection.material() else {
        return Color::ZERO;
    };

    let point = intersection.intersection_point();
    let photons = map.find_within_range(point, radius);
    if photons.is_empty() {
        return Color::ZERO;
    }

    let normal = intersection.compute_normal();
    let mut sum = Color::ZERO;
    for photon in photons {
        if (photon.normal.dot(normal).abs() - 1.0).abs() > NORMAL_TOLERANCE {
            continue;
        }
        let weight = kernel.weight(photon.position.distance(point), radius);
        if weight <= 0.0 {
            continue;
        }
        let brdf = material.compute_brdf(intersection, photon.energy, &photon.to_light_ray, from_camera);
        sum += brdf * weight;
    }

    (sum / (PI * radius * radius)).max(Color::ZERO)
}
