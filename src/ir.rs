use crate::graph::{FillStyle, LabelStyle, LineStyle, PointStyle};

// =============================================================================
// Phase 1: Extraction
// =============================================================================

/// Labelled magnitudes for bar and pie charts, in render order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Rows that survived null exclusion
    pub population: usize,
}

/// Points for line and scatter charts.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_axis: AxisKind,
    pub population: usize,
}

/// How x positions of a `PointSeries` map back to labels
#[derive(Debug, Clone, PartialEq)]
pub enum AxisKind {
    Continuous,
    /// Seconds since the epoch
    Temporal,
    /// Index into the first-seen category list
    Categorical(Vec<String>),
}

/// Equal-width histogram bins. `edges.len() == counts.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    /// Smoothed density on the count axis, empty when it cannot be estimated
    pub density: Vec<(f64, f64)>,
    pub population: usize,
}

/// Tukey summary of one group
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub label: String,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSeries {
    pub boxes: Vec<BoxStats>,
    pub population: usize,
}

/// Pivoted heatmap values. `cells[row][col]` with rows along `y_labels`.
/// `None` marks a cell with no defined value.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatGrid {
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
    pub population: usize,
}

// =============================================================================
// Phase 2: Scaling
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub domain: (f64, f64), // Data min/max after padding
    pub is_categorical: bool,
    pub is_temporal: bool,
    pub categories: Vec<String>, // If categorical, maps index -> label
}

// =============================================================================
// Phase 3: Compilation (Scene Graph)
// =============================================================================

/// A list of primitive drawing commands plus the frame around them.
/// The backend just executes these blindly.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_scale: Scale,
    pub y_scale: Scale,
    /// Pie charts draw in a bare unit square
    pub show_axes: bool,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    DrawLine {
        points: Vec<(f64, f64)>,
        style: LineStyle,
    },
    DrawPoint {
        points: Vec<(f64, f64)>,
        style: PointStyle,
    },
    DrawRect {
        // Top-Left, Bottom-Right
        tl: (f64, f64),
        br: (f64, f64),
        style: FillStyle,
    },
    DrawPolygon {
        points: Vec<(f64, f64)>,
        style: FillStyle,
    },
    DrawText {
        at: (f64, f64),
        text: String,
        style: LabelStyle,
    },
}
