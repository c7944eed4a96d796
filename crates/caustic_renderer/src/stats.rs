//! Counters gathered per worker and merged after the join.

use caustic_core::Color;

/// Pixel loop counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub pixels: u64,
    pub samples: u64,
    pub primary_hits: u64,
    pub primary_misses: u64,
    /// Pixels that stopped before `max_samples_per_pixel`
    pub adaptive_early_exits: u64,
}

impl RenderStats {
    pub fn merge(&mut self, other: &RenderStats) {
        self.pixels += other.pixels;
        self.samples += other.samples;
        self.primary_hits += other.primary_hits;
        self.primary_misses += other.primary_misses;
        self.adaptive_early_exits += other.adaptive_early_exits;
    }

    pub fn average_samples_per_pixel(&self) -> f32 {
        if self.pixels == 0 {
            0.0
        } else {
            self.samples as f32 / self.pixels as f32
        }
    }
}

/// Photon tracing counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotonStats {
    /// Photons leaving a light
    pub emitted: u64,
    /// Photons discarded by the caustic pass because they first hit a
    /// non-specular surface
    pub rejected: u64,
    pub stored: u64,
    pub absorbed: u64,
    pub escaped: u64,
    pub bounce_limited: u64,
    pub emitted_energy: Color,
    pub stored_energy: Color,
}

impl PhotonStats {
    pub fn merge(&mut self, other: &PhotonStats) {
        self.emitted += other.emitted;
        self.rejected += other.rejected;
        self.stored += other.stored;
        self.absorbed += other.absorbed;
        self.escaped += other.escaped;
        self.bounce_limited += other.bounce_limited;
        self.emitted_energy += other.emitted_energy;
        self.stored_energy += other.stored_energy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counters() {
        let mut a = RenderStats {
            pixels: 2,
            samples: 6,
            ..Default::default()
        };
        a.merge(&RenderStats {
            pixels: 2,
            samples: 2,
            primary_hits: 1,
            ..Default::default()
        });
        assert_eq!(a.pixels, 4);
        assert_eq!(a.primary_hits, 1);
        assert!((a.average_samples_per_pixel() - 2.0).abs() < 1e-6);
        assert_eq!(RenderStats::default().average_samples_per_pixel(), 0.0);
    }
}
