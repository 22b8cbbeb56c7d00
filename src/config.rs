use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::processing::filters::OrderStatistic;

/// Parameters for face extraction and the filter bank.
///
/// Missing fields in a settings file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub gaussian_kernel: u32,
    /// 0 derives sigma from the kernel size
    pub gaussian_sigma: f32,
    pub laplacian_kernel: u32,
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    pub order_kernel: u32,
    pub order_kind: OrderStatistic,
    pub high_boost_k: f32,
    /// Margin around a detected face, as a fraction of its larger side
    pub face_margin: f32,
    /// Enlargement applied to the face crop
    pub face_scale: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            gaussian_kernel: 5,
            gaussian_sigma: 0.0,
            laplacian_kernel: 3,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            order_kernel: 3,
            order_kind: OrderStatistic::Median,
            high_boost_k: 1.5,
            face_margin: 0.2,
            face_scale: 2.0,
        }
    }
}

impl FilterSettings {
    /// Load settings from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
