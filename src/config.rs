use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::builders::DEFAULT_BINS;
use crate::data::DEFAULT_CATEGORICAL_MAX_DISTINCT;
use crate::graph::MAX_IMAGE_SIDE;
use crate::RenderOptions;

/// Read-only process configuration, built once at start-up and passed down.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VizConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub render: RenderOptions,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    #[serde(default = "default_categorical_max_distinct")]
    pub categorical_max_distinct: usize,
}

fn default_output_dir() -> PathBuf { PathBuf::from("viz_outputs") }
fn default_histogram_bins() -> usize { DEFAULT_BINS }
fn default_categorical_max_distinct() -> usize { DEFAULT_CATEGORICAL_MAX_DISTINCT }

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            render: RenderOptions::default(),
            histogram_bins: DEFAULT_BINS,
            categorical_max_distinct: DEFAULT_CATEGORICAL_MAX_DISTINCT,
        }
    }
}

impl VizConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `SQLVIZ_*` variables from the process environment
    pub fn apply_env(self) -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("SQLVIZ_"))
            .collect();
        self.apply_vars(&vars)
    }

    /// Overlay settings from an explicit variable map.
    pub fn apply_vars(mut self, vars: &HashMap<String, String>) -> Result<Self> {
        if let Some(dir) = vars.get("SQLVIZ_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(w) = vars.get("SQLVIZ_WIDTH") {
            self.render.width = w
                .trim()
                .parse()
                .with_context(|| format!("SQLVIZ_WIDTH must be a positive integer, got '{}'", w))?;
        }
        if let Some(h) = vars.get("SQLVIZ_HEIGHT") {
            self.render.height = h
                .trim()
                .parse()
                .with_context(|| format!("SQLVIZ_HEIGHT must be a positive integer, got '{}'", h))?;
        }
        if let Some(f) = vars.get("SQLVIZ_FORMAT") {
            self.render.format = f.parse().map_err(anyhow::Error::msg)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.width == 0 || self.render.height == 0 {
            anyhow::bail!(
                "Image size must be non-zero, got {}x{}",
                self.render.width,
                self.render.height
            );
        }
        if self.render.width > MAX_IMAGE_SIDE || self.render.height > MAX_IMAGE_SIDE {
            anyhow::bail!(
                "Image size {}x{} exceeds the {}px limit",
                self.render.width,
                self.render.height,
                MAX_IMAGE_SIDE
            );
        }
        if self.histogram_bins == 0 {
            anyhow::bail!("histogram_bins must be at least 1");
        }
        Ok(())
    }
}
