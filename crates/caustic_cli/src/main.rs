//! caustic - render a Cornell box with backward ray tracing or photon mapping.
//!
//! Settings come from an optional JSON file; command-line flags override
//! individual values. Set `RUST_LOG` to change the log level.

mod config;
mod cornell;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use caustic_core::AccelerationKind;
use caustic_renderer::{render, BackwardRenderer, ImageBuffer, PhotonMappingRenderer, Renderer};
use clap::{Parser, ValueEnum};

use config::RenderConfig;
use cornell::ScenePreset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RendererKind {
    /// Direct lighting with mirror and glass recursion
    Backward,
    /// Backward tracing plus diffuse and caustic photon maps
    Photon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Acceleration {
    None,
    Grid,
    Bvh,
}

impl From<Acceleration> for AccelerationKind {
    fn from(value: Acceleration) -> Self {
        match value {
            Acceleration::None => AccelerationKind::None,
            Acceleration::Grid => AccelerationKind::UniformGrid,
            Acceleration::Bvh => AccelerationKind::Bvh,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Render a Cornell box with photon mapping")]
struct Args {
    /// JSON file with `render`, `photons` and `sampler` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PNG
    #[arg(short, long, default_value = "caustic.png")]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = ScenePreset::Mixed)]
    scene: ScenePreset,

    #[arg(short, long, value_enum, default_value_t = RendererKind::Photon)]
    renderer: RendererKind,

    #[arg(short, long, value_enum, default_value_t = Acceleration::Bvh)]
    acceleration: Acceleration,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Maximum samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Stop sampling a pixel once its luminance variance settles
    #[arg(long)]
    adaptive: bool,

    #[arg(long)]
    diffuse_photons: Option<usize>,

    #[arg(long)]
    caustic_photons: Option<usize>,

    /// Final gather rays per shading point (0 disables final gather)
    #[arg(long)]
    gather_samples: Option<u32>,

    /// Worker threads, 0 for one per core
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn apply(&self, config: &mut RenderConfig) {
        let render = &mut config.render;
        if let Some(width) = self.width {
            render.width = width;
        }
        if let Some(height) = self.height {
            render.height = height;
        }
        if let Some(samples) = self.samples {
            render.max_samples_per_pixel = samples;
            render.min_samples_per_pixel = render.min_samples_per_pixel.min(samples);
        }
        if self.adaptive {
            render.adaptive_sampling = true;
        }
        if let Some(threads) = self.threads {
            render.threads = threads;
        }

        let photons = &mut config.photons;
        if let Some(count) = self.diffuse_photons {
            photons.diffuse_photons = count;
        }
        if let Some(count) = self.caustic_photons {
            photons.caustic_photons = count;
        }
        if let Some(samples) = self.gather_samples {
            photons.gather_samples = samples;
        }

        if let Some(seed) = self.seed {
            config.render.seed = seed;
            config.photons.seed = seed;
        }
    }
}

fn save_png(buffer: &ImageBuffer, path: &Path) -> Result<()> {
    let png = image::RgbaImage::from_raw(buffer.width, buffer.height, buffer.to_rgba())
        .context("Pixel buffer does not match the image resolution")?;
    png.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    args.apply(&mut config);

    if args.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    log::info!("Starting caustic: {:?} scene, {:?} renderer", args.scene, args.renderer);

    let scene = Arc::new(
        cornell::build_scene(args.scene, args.acceleration.into()).context("Failed to build scene")?,
    );
    let sampler = config.sampler.build();
    let camera = cornell::camera(config.render.aspect_ratio());

    let mut renderer: Box<dyn Renderer> = match args.renderer {
        RendererKind::Backward => Box::new(BackwardRenderer::new(scene, sampler)),
        RendererKind::Photon => Box::new(PhotonMappingRenderer::new(scene, sampler, config.photons.clone())),
    };
    renderer.initialize_renderer();

    let (buffer, _stats) = render(&camera, renderer.as_ref(), &config.render).context("Render failed")?;
    save_png(&buffer, &args.output)?;
    log::info!("Wrote {}", args.output.display());

    Ok(())
}
