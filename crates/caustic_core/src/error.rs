//! Errors raised while building acceleration structures and scenes.

use glam::UVec3;
use thiserror::Error;

/// Configuration violations detected when a scene is built.
///
/// These are fatal for the scene being built; nothing is partially usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccelError {
    #[error("BVH leaves must hold at least one primitive (got {0})")]
    InvalidLeafCapacity(usize),

    #[error("BVH nodes need at least two children (got {0})")]
    InvalidMaximumChildren(usize),

    #[error("Uniform grid resolution must be non-zero on every axis (got {0})")]
    InvalidGridSize(UVec3),

    #[error("Mesh '{mesh}' references vertex {index} but only has {count} vertices")]
    InvalidVertexIndex {
        mesh: String,
        index: u32,
        count: usize,
    },

    #[error("Mesh '{mesh}' has {normals} normals for {positions} vertices")]
    NormalCountMismatch {
        mesh: String,
        normals: usize,
        positions: usize,
    },
}

/// Result type for scene and acceleration building.
pub type AccelResult<T> = Result<T, AccelError>;
