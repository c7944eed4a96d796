//! caustic renderer
//!
//! Backward ray tracing and photon mapping over a built [`caustic_core::Scene`].
//!
//! Rendering happens in two phases: [`Renderer::initialize_renderer`] traces
//! photons and freezes the maps, then [`render`] runs the row-parallel pixel
//! loop against the read-only renderer.

mod camera;
mod error;
mod gather;
mod image;
mod photon;
mod render;
mod renderer;
mod sampler;
mod settings;
mod stats;
mod tracer;

pub use camera::{Camera, PerspectiveCamera};
pub use error::{RenderError, RenderResult};
pub use gather::{density_estimate, FilterKernel};
pub use image::{color_to_rgba, linear_to_gamma, ImageBuffer};
pub use photon::{Photon, PhotonMap, PhotonMapBuilder};
pub use render::{partition_rows, render, RowRange};
pub use renderer::{BackwardRenderer, PhotonMappingRenderer, Renderer};
pub use sampler::{
    ColorSampler, JitterSampler, PoissonDiskSampler, SamplerKind, SamplerState, StratifiedSampler,
};
pub use settings::{PhotonSettings, RenderSettings};
pub use stats::{PhotonStats, RenderStats};
pub use tracer::{PhotonMapKind, PhotonMaps, PhotonTracer};

/// Derive an independent generator seed for `stream` from a base seed.
///
/// Uses the splitmix64 finalizer so neighbouring streams start far apart.
pub(crate) fn stream_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed
        .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
