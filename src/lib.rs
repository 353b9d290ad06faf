// Library exports for sqlviz

pub mod artifact;
pub mod builders;
pub mod config;
pub mod csv_reader;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod intent;
pub mod logging;
pub mod markers;
pub mod palette;
pub mod shape;
pub mod store;

// Rendering pipeline
pub mod ir;
pub mod transform;
pub mod scale;
pub mod compiler;

pub use artifact::{Artifact, ArtifactRef};
pub use config::VizConfig;
pub use data::{ColumnDef, ColumnType, ResultTable, Scalar};
pub use dispatch::Dispatcher;
pub use error::{ChartError, Result};
pub use intent::{Aggregation, ChartIntent, ChartKind, Orientation};
pub use store::ArtifactStore;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            other => Err(format!("unknown output format '{}' (expected png or svg)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
        }
    }
}
