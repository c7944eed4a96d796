//! Row-parallel pixel loop.
//!
//! The image is split into contiguous row ranges, one per worker of a
//! fixed-size rayon pool. Each worker writes only its own rows, owns its
//! generator and counters, and hands the counters back at the join.

use std::time::Instant;

use caustic_core::{Color, IntersectionState};
use caustic_math::{luminance, Ray, Vec2};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::image::ImageBuffer;
use crate::renderer::Renderer;
use crate::sampler::{ColorSampler, SamplerState};
use crate::settings::RenderSettings;
use crate::stats::RenderStats;
use crate::stream_seed;

/// Rows `start..end` of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Split `height` rows into at most `workers` contiguous ranges whose
/// sizes differ by at most one.
pub fn partition_rows(height: u32, workers: usize) -> Vec<RowRange> {
    let count = (workers.max(1) as u32).min(height);
    if count == 0 {
        return Vec::new();
    }
    let base = height / count;
    let extra = height % count;

    let mut ranges = Vec::with_capacity(count as usize);
    let mut start = 0;
    for i in 0..count {
        let len = base + u32::from(i < extra);
        ranges.push(RowRange { start, end: start + len });
        start += len;
    }
    ranges
}

/// Render every pixel of the image described by `settings`.
///
/// The renderer must already be initialized. Output is deterministic for a
/// given seed and worker count.
pub fn render(
    camera: &dyn Camera,
    renderer: &dyn Renderer,
    settings: &RenderSettings,
) -> RenderResult<(ImageBuffer, RenderStats)> {
    if settings.width == 0 || settings.height == 0 {
        return Err(RenderError::InvalidResolution {
            width: settings.width,
            height: settings.height,
        });
    }
    if settings.max_samples_per_pixel == 0 {
        return Err(RenderError::InvalidSampleCount(settings.max_samples_per_pixel));
    }
    if settings.min_samples_per_pixel > settings.max_samples_per_pixel {
        log::warn!(
            "min_samples_per_pixel {} exceeds max_samples_per_pixel {}, clamping",
            settings.min_samples_per_pixel,
            settings.max_samples_per_pixel
        );
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.threads)
        .build()?;
    let ranges = partition_rows(settings.height, pool.current_num_threads());
    let width = settings.width as usize;

    let mut image = ImageBuffer::new(settings.width, settings.height);
    let mut slices = Vec::with_capacity(ranges.len());
    let mut rest: &mut [Color] = &mut image.pixels;
    for range in &ranges {
        let (rows, tail) = std::mem::take(&mut rest).split_at_mut(range.len() as usize * width);
        slices.push((*range, rows));
        rest = tail;
    }

    log::info!(
        "Rendering {}x{} with {} workers, up to {} samples per pixel",
        settings.width,
        settings.height,
        ranges.len(),
        settings.max_samples_per_pixel
    );
    let start = Instant::now();

    let worker_stats: Vec<RenderStats> = pool.install(|| {
        slices
            .into_par_iter()
            .enumerate()
            .map(|(worker, (range, rows))| {
                let mut rng = StdRng::seed_from_u64(stream_seed(settings.seed, worker as u64));
                render_rows(camera, renderer, settings, range, rows, &mut rng)
            })
            .collect()
    });

    let mut stats = RenderStats::default();
    for worker in &worker_stats {
        stats.merge(worker);
    }

    log::info!(
        "Rendered {} pixels in {:.2?}: {:.2} samples per pixel, {} hits, {} misses, {} early exits",
        stats.pixels,
        start.elapsed(),
        stats.average_samples_per_pixel(),
        stats.primary_hits,
        stats.primary_misses,
        stats.adaptive_early_exits
    );

    Ok((image, stats))
}

fn render_rows(
    camera: &dyn Camera,
    renderer: &dyn Renderer,
    settings: &RenderSettings,
    range: RowRange,
    rows: &mut [Color],
    rng: &mut dyn RngCore,
) -> RenderStats {
    let mut stats = RenderStats::default();
    let sampler = renderer.sampler();
    let mut sampler_state = sampler.create_sampler(settings.max_samples_per_pixel);

    for (offset, row) in rows.chunks_mut(settings.width as usize).enumerate() {
        let y = range.start + offset as u32;
        for (x, pixel) in row.iter_mut().enumerate() {
            sampler_state.reset();
            let pixel_coords = Vec2::new(x as f32, y as f32);
            *pixel = render_pixel(
                camera,
                renderer,
                sampler,
                &mut sampler_state,
                settings,
                pixel_coords,
                rng,
                &mut stats,
            );
        }
    }
    stats
}

/// Average of up to `max_samples_per_pixel` samples, stopping early once the
/// running luminance variance is below `adaptive_coefficient`.
#[allow(clippy::too_many_arguments)]
fn render_pixel(
    camera: &dyn Camera,
    renderer: &dyn Renderer,
    sampler: &dyn ColorSampler,
    sampler_state: &mut SamplerState,
    settings: &RenderSettings,
    pixel_coords: Vec2,
    rng: &mut dyn RngCore,
    stats: &mut RenderStats,
) -> Color {
    let max_samples = settings.max_samples_per_pixel;
    let min_samples = settings.min_samples_per_pixel.clamp(1, max_samples).max(2);
    let resolution = settings.resolution().as_vec2();

    let mut sum = Color::ZERO;
    let mut taken = 0u32;
    // Welford's running mean and squared deviation of sample luminance
    let mut mean = 0.0f32;
    let mut m2 = 0.0f32;

    while taken < max_samples {
        let offset = sampler.compute_sample_coordinate(sampler_state, rng);
        let ray = camera.generate_ray_for_normalized_coordinates((pixel_coords + offset) / resolution);
        let color = trace_primary(renderer, settings, &ray, rng, stats);

        sum += color;
        taken += 1;
        let l = luminance(color);
        let delta = l - mean;
        mean += delta / taken as f32;
        m2 += delta * (l - mean);

        if settings.adaptive_sampling && taken >= min_samples && taken < max_samples {
            let variance = m2 / (taken - 1) as f32;
            if variance < settings.adaptive_coefficient {
                stats.adaptive_early_exits += 1;
                break;
            }
        }
    }

    stats.pixels += 1;
    stats.samples += u64::from(taken);
    sum / taken as f32
}

fn trace_primary(
    renderer: &dyn Renderer,
    settings: &RenderSettings,
    ray: &Ray,
    rng: &mut dyn RngCore,
    stats: &mut RenderStats,
) -> Color {
    let mut state = IntersectionState::new(settings.max_reflection_bounces, settings.max_refraction_bounces);
    if renderer.scene().trace(ray, &mut state) {
        stats.primary_hits += 1;
        renderer.compute_sample_color(&state, ray, rng)
    } else {
        stats.primary_misses += 1;
        settings.background
    }
}
