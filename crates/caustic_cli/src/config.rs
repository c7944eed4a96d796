//! JSON render configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use caustic_renderer::{PhotonSettings, RenderSettings, SamplerKind};
use serde::{Deserialize, Serialize};

/// Everything a render needs besides the scene.
///
/// Every section is optional in the file; missing fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub render: RenderSettings,
    pub photons: PhotonSettings,
    pub sampler: SamplerKind,
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }
}
