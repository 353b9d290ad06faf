// One builder per chart kind. Each turns a validated plan into an encoded image.

mod bar;
mod boxplot;
mod heatmap;
mod histogram;
mod line;
mod pie;
mod scatter;

use plotters::style::RGBColor;
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::compiler::Frame;
use crate::data::ResultTable;
use crate::error::{ChartError, Result};
use crate::graph;
use crate::intent::{Aggregation, ChartIntent, ChartKind, Orientation};
use crate::ir::SceneGraph;
use crate::palette::{self, STEELBLUE};
use crate::shape::ChartPlan;
use crate::RenderOptions;

pub const DEFAULT_BINS: usize = 30;
pub const MAX_BINS: usize = 200;

/// Presentation settings resolved from an intent and the render config
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub aggregation: Option<Aggregation>,
    pub orientation: Orientation,
    pub bins: usize,
    pub color: RGBColor,
    pub render: RenderOptions,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: None,
            x_label: None,
            y_label: None,
            aggregation: None,
            orientation: Orientation::Vertical,
            bins: DEFAULT_BINS,
            color: STEELBLUE,
            render: RenderOptions::default(),
        }
    }
}

impl ChartOptions {
    /// Fails with `MalformedIntent` on a colour that cannot be parsed.
    pub fn from_intent(intent: &ChartIntent, render: &RenderOptions, default_bins: usize) -> Result<Self> {
        let color = match intent.color.as_deref() {
            Some(c) => palette::parse_color(c)
                .ok_or_else(|| ChartError::MalformedIntent(format!("unknown color '{}'", c)))?,
            None => STEELBLUE,
        };
        Ok(Self {
            title: intent.title.clone(),
            x_label: intent.x_label.clone(),
            y_label: intent.y_label.clone(),
            aggregation: intent.aggregation,
            orientation: intent.orientation,
            bins: intent.bins.unwrap_or(default_bins).clamp(1, MAX_BINS),
            color,
            render: render.clone(),
        })
    }

    /// Frame for a chart, falling back to the given defaults for unset text
    fn frame(&self, title: String, x_label: &str, y_label: &str) -> Frame {
        Frame {
            width: self.render.width,
            height: self.render.height,
            title: self.title.clone().unwrap_or(title),
            x_label: Some(self.x_label.clone().unwrap_or_else(|| x_label.to_string())),
            y_label: Some(self.y_label.clone().unwrap_or_else(|| y_label.to_string())),
            color: self.color,
        }
    }

    /// Value axis caption, e.g. "sum of amount"
    fn value_label(&self, column: &str) -> String {
        match self.aggregation {
            Some(agg) => format!("{} of {}", agg, column),
            None => column.to_string(),
        }
    }
}

/// Route a validated plan to its builder.
pub fn build(plan: ChartPlan, table: &ResultTable, opts: &ChartOptions) -> Result<Artifact> {
    let kind = plan.kind();
    if let Some(agg) = opts.aggregation {
        if matches!(kind, ChartKind::Histogram | ChartKind::Scatter | ChartKind::Box) {
            warn!(kind = %kind, aggregation = %agg, "aggregation ignored for this chart kind");
        }
    }

    match plan {
        ChartPlan::Bar(cols) => bar::build(table, cols, opts),
        ChartPlan::Line(cols) => line::build(table, cols, opts),
        ChartPlan::Pie(cols) => pie::build(table, cols, opts),
        ChartPlan::Histogram { value } => histogram::build(table, value, opts),
        ChartPlan::Heatmap(cols) => heatmap::build(table, cols, opts),
        ChartPlan::Scatter(cols) => scatter::build(table, cols, opts),
        ChartPlan::Box(cols) => boxplot::build(table, cols, opts),
    }
}

/// Encode a compiled scene into an artifact
fn render(kind: ChartKind, scene: &SceneGraph, opts: &ChartOptions, rows_rendered: usize) -> Result<Artifact> {
    let format = opts.render.format;
    let bytes = graph::render_scene(scene, format)?;
    debug!(kind = %kind, bytes = bytes.len(), commands = scene.commands.len(), "rendered chart");
    Ok(Artifact::new(kind, format, bytes, rows_rendered))
}
