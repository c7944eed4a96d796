//! Sub-pixel sample placement.
//!
//! A [`ColorSampler`] hands out offsets inside the unit pixel square; the
//! pixel loop keeps one [`SamplerState`] per pixel.

use std::sync::Arc;

use caustic_core::random::gen_f32;
use glam::{UVec2, Vec2};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Per-pixel sampling progress.
#[derive(Debug, Clone, Default)]
pub struct SamplerState {
    index: u32,
    max_samples: u32,
    history: Vec<Vec2>,
}

impl SamplerState {
    pub fn new(max_samples: u32) -> Self {
        Self {
            index: 0,
            max_samples,
            history: Vec::new(),
        }
    }

    /// Number of offsets generated so far.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn max_samples(&self) -> u32 {
        self.max_samples
    }

    /// Offsets accepted so far (only recorded by samplers that need them).
    pub fn history(&self) -> &[Vec2] {
        &self.history
    }

    /// Start over for a new pixel without releasing the history buffer.
    pub fn reset(&mut self) {
        self.index = 0;
        self.history.clear();
    }
}

/// Strategy placing samples inside a pixel.
pub trait ColorSampler: Send + Sync {
    fn create_sampler(&self, max_samples: u32) -> SamplerState {
        SamplerState::new(max_samples)
    }

    /// Next offset in `[0, 1)^2`; advances `state`.
    fn compute_sample_coordinate(&self, state: &mut SamplerState, rng: &mut dyn RngCore) -> Vec2;
}

fn grid_cell(index: u32, grid: UVec2) -> Vec2 {
    let grid = grid.max(UVec2::ONE);
    let cell = index % (grid.x * grid.y);
    Vec2::new((cell % grid.x) as f32, (cell / grid.x) as f32)
}

/// Cell centres of a regular grid, visited in row-major order.
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    grid: UVec2,
}

impl StratifiedSampler {
    pub fn new(grid: UVec2) -> Self {
        Self {
            grid: grid.max(UVec2::ONE),
        }
    }
}

impl ColorSampler for StratifiedSampler {
    fn compute_sample_coordinate(&self, state: &mut SamplerState, _rng: &mut dyn RngCore) -> Vec2 {
        let cell = grid_cell(state.index, self.grid);
        state.index += 1;
        (cell + Vec2::splat(0.5)) / self.grid.as_vec2()
    }
}

/// A random position inside each grid cell.
#[derive(Debug, Clone)]
pub struct JitterSampler {
    grid: UVec2,
}

impl JitterSampler {
    pub fn new(grid: UVec2) -> Self {
        Self {
            grid: grid.max(UVec2::ONE),
        }
    }
}

impl ColorSampler for JitterSampler {
    fn compute_sample_coordinate(&self, state: &mut SamplerState, rng: &mut dyn RngCore) -> Vec2 {
        let cell = grid_cell(state.index, self.grid);
        state.index += 1;
        let jitter = Vec2::new(gen_f32(rng), gen_f32(rng));
        (cell + jitter) / self.grid.as_vec2()
    }
}

/// Random offsets kept at least `2 * radius` apart.
///
/// Candidates are drawn from the square shrunk by `radius` on every side.
/// After `max_attempts` rejections the last candidate is accepted so a
/// crowded pixel cannot stall the render.
#[derive(Debug, Clone)]
pub struct PoissonDiskSampler {
    radius: f32,
    max_attempts: u32,
}

impl PoissonDiskSampler {
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.clamp(0.0, 0.5),
            max_attempts: 30,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn candidate(&self, rng: &mut dyn RngCore) -> Vec2 {
        let span = 1.0 - 2.0 * self.radius;
        Vec2::splat(self.radius) + Vec2::new(gen_f32(rng), gen_f32(rng)) * span
    }
}

impl ColorSampler for PoissonDiskSampler {
    fn compute_sample_coordinate(&self, state: &mut SamplerState, rng: &mut dyn RngCore) -> Vec2 {
        let min_distance_sq = (2.0 * self.radius).powi(2);
        let mut sample = self.candidate(rng);
        for _ in 1..self.max_attempts {
            let crowded = state
                .history
                .iter()
                .any(|p| p.distance_squared(sample) < min_distance_sq);
            if !crowded {
                break;
            }
            sample = self.candidate(rng);
        }
        state.history.push(sample);
        state.index += 1;
        sample
    }
}

/// Serializable choice of sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplerKind {
    Stratified { grid: [u32; 2] },
    Jitter { grid: [u32; 2] },
    PoissonDisk { radius: f32 },
}

impl SamplerKind {
    pub fn build(&self) -> Arc<dyn ColorSampler> {
        match self {
            SamplerKind::Stratified { grid } => Arc::new(StratifiedSampler::new(UVec2::from(*grid))),
            SamplerKind::Jitter { grid } => Arc::new(JitterSampler::new(UVec2::from(*grid))),
            SamplerKind::PoissonDisk { radius } => Arc::new(PoissonDiskSampler::new(*radius)),
        }
    }
}

impl Default for SamplerKind {
    fn default() -> Self {
        SamplerKind::Jitter { grid: [1, 1] }
    }
}
