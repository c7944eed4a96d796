//! Renderer errors.

use thiserror::Error;

/// Errors returned by the render entry points.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Image resolution must be non-zero (got {width}x{height})")]
    InvalidResolution { width: u32, height: u32 },

    #[error("At least one sample per pixel is required (got {0})")]
    InvalidSampleCount(u32),

    #[error("Failed to create render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
