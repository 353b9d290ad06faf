use plotters::style::{RGBColor, BLACK, WHITE};
use std::f64::consts::PI;

use crate::graph::{Anchor, FillStyle, LabelStyle, LineStyle, PointStyle};
use crate::intent::Orientation;
use crate::ir::{AxisKind, Bins, BoxSeries, CategorySeries, DrawCommand, HeatGrid, PointSeries, SceneGraph};
use crate::palette;
use crate::scale::{self, format_thousands};

/// Canvas-level settings shared by every chart kind
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub color: RGBColor,
}

const BAR_WIDTH: f64 = 0.8;

// =============================================================================
// Boxplot Geometry Helpers
// =============================================================================

/// Computed geometry for a single boxplot, expressed as primitive shapes
struct BoxplotGeometry {
    lower_whisker: Vec<(f64, f64)>,
    upper_whisker: Vec<(f64, f64)>,
    min_cap: Vec<(f64, f64)>,
    max_cap: Vec<(f64, f64)>,
    box_tl: (f64, f64),
    box_br: (f64, f64),
    median_line: Vec<(f64, f64)>,
    outlier_points: Vec<(f64, f64)>,
}

#[allow(clippy::too_many_arguments)]
fn compute_boxplot_geometry(
    x: f64,
    width: f64,
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
    outliers: &[f64],
) -> BoxplotGeometry {
    let half_width = width / 2.0;
    let cap_half = width * 0.2;

    BoxplotGeometry {
        lower_whisker: vec![(x, min), (x, q1)],
        upper_whisker: vec![(x, q3), (x, max)],
        min_cap: vec![(x - cap_half, min), (x + cap_half, min)],
        max_cap: vec![(x - cap_half, max), (x + cap_half, max)],
        box_tl: (x - half_width, q3),
        box_br: (x + half_width, q1),
        median_line: vec![(x - half_width, median), (x + half_width, median)],
        outlier_points: outliers.iter().map(|&v| (x, v)).collect(),
    }
}

// =============================================================================
// Per-kind compilation
// =============================================================================

/// Bars with their value printed past the end of each bar.
///
/// Horizontal orientation swaps the axes: categories run down the y axis.
pub fn compile_bar(series: &CategorySeries, frame: Frame, orientation: Orientation) -> SceneGraph {
    let is_flipped = orientation == Orientation::Horizontal;
    let fill = FillStyle {
        fill: frame.color,
        alpha: 1.0,
        border: None,
    };

    let mut commands = Vec::with_capacity(series.values.len() * 2);
    for (i, &v) in series.values.iter().enumerate() {
        let x = i as f64;
        let (tl, br) = if is_flipped {
            ((0.0, x + BAR_WIDTH / 2.0), (v, x - BAR_WIDTH / 2.0))
        } else {
            ((x - BAR_WIDTH / 2.0, v), (x + BAR_WIDTH / 2.0, 0.0))
        };
        commands.push(DrawCommand::DrawRect {
            tl,
            br,
            style: fill.clone(),
        });
    }
    for (i, &v) in series.values.iter().enumerate() {
        let x = i as f64;
        let (at, anchor) = if is_flipped {
            ((v, x), Anchor::Right)
        } else {
            ((x, v), Anchor::Above)
        };
        commands.push(DrawCommand::DrawText {
            at,
            text: format_thousands(v),
            style: LabelStyle {
                anchor,
                size: 11,
                ..LabelStyle::default()
            },
        });
    }

    let category_scale = scale::categorical(series.labels.clone());
    // Room for the value labels past the longest bar
    let mut value_scale = scale::continuous(series.values.iter().copied(), true);
    value_scale.domain.1 =
        (value_scale.domain.1 + value_scale.domain.1 * 0.05 - value_scale.domain.0 * 0.05).min(f64::MAX);

    let (x_scale, y_scale, x_label, y_label) = if is_flipped {
        (value_scale, category_scale, frame.y_label, frame.x_label)
    } else {
        (category_scale, value_scale, frame.x_label, frame.y_label)
    };

    SceneGraph {
        width: frame.width,
        height: frame.height,
        title: frame.title,
        x_label,
        y_label,
        x_scale,
        y_scale,
        show_axes: true,
        commands,
    }
}

/// Polyline through the points with a marker on each.
pub fn compile_line(series: &PointSeries, frame: Frame) -> SceneGraph {
    let points: Vec<(f64, f64)> = series.x.iter().copied().zip(series.y.iter().copied()).collect();
    let commands = vec![
        DrawCommand::DrawLine {
            points: points.clone(),
            style: LineStyle {
                color: frame.color,
                width: 2,
                alpha: 1.0,
            },
        },
        DrawCommand::DrawPoint {
            points,
            style: PointStyle {
                color: frame.color,
                size: 4,
                alpha: 1.0,
            },
        },
    ];

    let x_scale = match &series.x_axis {
        AxisKind::Continuous => scale::continuous(series.x.iter().copied(), false),
        AxisKind::Temporal => scale::temporal(series.x.iter().copied()),
        AxisKind::Categorical(categories) => scale::categorical(categories.clone()),
    };

    SceneGraph {
        width: frame.width,
        height: frame.height,
        title: frame.title,
        x_label: frame.x_label,
        y_label: frame.y_label,
        x_scale,
        y_scale: scale::continuous(series.y.iter().copied(), false),
        show_axes: true,
        commands,
    }
}

pub fn compile_scatter(series: &PointSeries, frame: Frame) -> SceneGraph {
    let points: Vec<(f64, f64)> = series.x.iter().copied().zip(series.y.iter().copied()).collect();
    SceneGraph {
        width: frame.width,
        height: frame.height,
        title: frame.title,
        x_label: frame.x_label,
        y_label: frame.y_label,
        x_scale: scale::continuous(series.x.iter().copied(), false),
        y_scale: scale::continuous(series.y.iter().copied(), false),
        show_axes: true,
        commands: vec![DrawCommand::DrawPoint {
            points,
            style: PointStyle {
                color: frame.color,
                size: 4,
                alpha: 0.6,
            },
        }],
    }
}

/// Slices start at 12 o'clock and run counter-clockwise in series order.
///
/// Callers guarantee the values are non-negative with a positive total.
pub fn compile_pie(series: &CategorySeries, frame: Frame) -> SceneGraph {
    let shares = slice_shares(&series.values);

    // Keep the circle round on a non-square canvas
    let plot_w = frame.width.saturating_sub(20).max(1) as f64;
    let plot_h = frame.height.saturating_sub(50).max(1) as f64;
    let aspect = plot_w / plot_h;
    let half_h = 1.3;
    let half_w = half_h * aspect;

    let mut commands = Vec::with_capacity(series.values.len() * 3);
    let mut labels = Vec::with_capacity(series.values.len() * 2);
    let mut start = PI / 2.0;
    for (i, (label, &share)) in series.labels.iter().zip(&shares).enumerate() {
        if share <= 0.0 {
            continue;
        }
        let sweep = 2.0 * PI * share;
        let end = start + sweep;
        let steps = ((sweep / (2.0 * PI)) * 180.0).ceil().max(2.0) as usize;

        let mut points = Vec::with_capacity(steps + 2);
        points.push((0.0, 0.0));
        for s in 0..=steps {
            let theta = start + sweep * s as f64 / steps as f64;
            points.push((theta.cos(), theta.sin()));
        }
        commands.push(DrawCommand::DrawPolygon {
            points,
            style: FillStyle {
                fill: palette::categorical(i),
                alpha: 1.0,
                border: Some(WHITE),
            },
        });

        let mid = (start + end) / 2.0;
        labels.push(DrawCommand::DrawText {
            at: (0.6 * mid.cos(), 0.6 * mid.sin()),
            text: format!("{:.1}%", 100.0 * share),
            style: LabelStyle {
                size: 11,
                ..LabelStyle::default()
            },
        });
        labels.push(DrawCommand::DrawText {
            at: (1.15 * mid.cos(), 1.15 * mid.sin()),
            text: label.clone(),
            style: LabelStyle::default(),
        });
        start = end;
    }
    commands.extend(labels);

    SceneGraph {
        width: frame.width,
        height: frame.height,
        title: frame.title,
        x_label: None,
        y_label: None,
        x_scale: scale::fixed(-half_w, half_w),
        y_scale: scale::fixed(-half_h, half_h),
        show_axes: false,
        commands,
    }
}

/// Fraction of the whole for each slice.
///
/// Values are scaled by the largest one first so the total cannot overflow.
fn slice_shares(values: &[f64]) -> Vec<f64> {
    let peak = values.iter().copied().fold(0.0, f64::max);
    if !(peak > 0.0) {
        return vec![0.0; values.len()];
    }
    let scaled: Vec<f64> = values.iter().map(|v| v.max(0.0) / peak).collect();
    let total: f64 = scaled.iter().sum();
    scaled.into_iter().map(|v| v / total).collect()
}

pub fn compile_histogram(bins: &Bins, frame: Frame) -> SceneGraph {
    let style = FillStyle {
        fill: frame.color,
        alpha: 0.7,
        border: Some(BLACK),
    };
    let mut commands: Vec<DrawCommand> = bins
        .counts
        .iter()
        .enumerate()
        .map(|(i, &count)| DrawCommand::DrawRect {
            tl: (bins.edges[i], count as f64),
            br: (bins.edges[i + 1], 0.0),
            style: style.clone(),
        })
        .collect();
    // Density overlay above the bars
    if !bins.density.is_empty() {
        commands.push(DrawCommand::DrawLine {
            points: bins.density.clone(),
            style: LineStyle {
                color: frame.color,
                width: 2,
                alpha: 1.0,
            },
        });
    }

    let (lo, hi) = match (bins.edges.first(), bins.edges.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => (0.0, 1.0),
    };
    let (lo, hi) = scale::pad_range(lo, hi);

    SceneGraph {
        width: frame.width,
        height: frame.height,
        title: frame.title,
        x_label: frame.x_label,
        y_label: frame.y_label.or_else(|| Some("Frequency".to_string())),
        x_scale: scale::fixed(lo, hi),
        y_scale: scale::continuous(
            bins.counts
                .iter()
                .map(|&c| c as f64)
                .chain(bins.density.iter().map(|&(_, y)| y)),
            true,
        ),
        show_axes: true,
        commands,
    }
}

/// Coloured cells with the value printed in each defined cell.
///
/// The first y label is drawn as the top row.
pub fn compile_heatmap(grid: &HeatGrid, frame: Frame) -> SceneGraph {
    let defined: Vec<f64> = grid.cells.iter().flatten().filter_map(|c| *c).collect();
    let min = defined.iter().copied().fold(f64::INFINITY, f64::min);
    let max = defined.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Halved so the span of extreme values stays finite
    let span = max / 2.0 - min / 2.0;

    let rows = grid.y_labels.len();
    let mut commands = Vec::new();
    for (yi, row) in grid.cells.iter().enumerate() {
        let y = (rows - 1 - yi) as f64;
        for (xi, cell) in row.iter().enumerate() {
            let Some(v) = *cell else { continue };
            let x = xi as f64;
            let t = if span > 0.0 { (v / 2.0 - min / 2.0) / span } else { 0.5 };
            let fill = palette::sequential(t);
            commands.push(DrawCommand::DrawRect {
                tl: (x - 0.5, y + 0.5),
                br: (x + 0.5, y - 0.5),
                style: FillStyle {
                    fill,
                    alpha: 1.0,
                    border: Some(WHITE),
                },
            });
            commands.push(DrawCommand::DrawText {
                at: (x, y),
                text: format!("{:.0}", v),
                style: LabelStyle {
                    color: palette::contrast_text(fill),
                    size: 11,
                    anchor: Anchor::Center,
                },
            });
        }
    }

    let y_categories: Vec<String> = grid.y_labels.iter().rev().cloned().collect();

    SceneGraph {
        width: frame.width,
        height: frame.height,
        title: frame.title,
        x_label: frame.x_label,
        y_label: frame.y_label,
        x_scale: scale::categorical(grid.x_labels.clone()),
        y_scale: scale::categorical(y_categories),
        show_axes: true,
        commands,
    }
}

pub fn compile_box(series: &BoxSeries, frame: Frame) -> SceneGraph {
    let whisker_style = LineStyle {
        color: frame.color,
        width: 2,
        alpha: 1.0,
    };
    let box_style = FillStyle {
        fill: frame.color,
        alpha: 0.7,
        border: Some(frame.color),
    };
    let median_style = LineStyle {
        color: WHITE,
        width: 2,
        alpha: 0.9,
    };
    let outlier_style = PointStyle {
        color: frame.color,
        size: 3,
        alpha: 1.0,
    };

    let mut commands = Vec::with_capacity(series.boxes.len() * 7);
    let mut extent = Vec::new();
    for (i, b) in series.boxes.iter().enumerate() {
        let geom = compute_boxplot_geometry(
            i as f64,
            0.6,
            b.lower_whisker,
            b.q1,
            b.median,
            b.q3,
            b.upper_whisker,
            &b.outliers,
        );

        commands.push(DrawCommand::DrawLine {
            points: geom.lower_whisker,
            style: whisker_style.clone(),
        });
        commands.push(DrawCommand::DrawLine {
            points: geom.upper_whisker,
            style: whisker_style.clone(),
        });
        commands.push(DrawCommand::DrawLine {
            points: geom.min_cap,
            style: whisker_style.clone(),
        });
        commands.push(DrawCommand::DrawLine {
            points: geom.max_cap,
            style: whisker_style.clone(),
        });
        commands.push(DrawCommand::DrawRect {
            tl: geom.box_tl,
            br: geom.box_br,
            style: box_style.clone(),
        });
        commands.push(DrawCommand::DrawLine {
            points: geom.median_line,
            style: median_style.clone(),
        });
        if !geom.outlier_points.is_empty() {
            commands.push(DrawCommand::DrawPoint {
                points: geom.outlier_points,
                style: outlier_style.clone(),
            });
        }

        extent.push(b.lower_whisker);
        extent.push(b.upper_whisker);
        extent.extend(b.outliers.iter().copied());
    }

    SceneGraph {
        width: frame.width,
        height: frame.height,
        title: frame.title,
        x_label: frame.x_label,
        y_label: frame.y_label,
        x_scale: scale::categorical(series.boxes.iter().map(|b| b.label.clone()).collect()),
        y_scale: scale::continuous(extent, false),
        show_axes: true,
        commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BoxStats;

    fn frame() -> Frame {
        Frame {
            width: 800,
            height: 600,
            title: "t".to_string(),
            x_label: Some("category".to_string()),
            y_label: Some("amount".to_string()),
            color: palette::STEELBLUE,
        }
    }

    fn bars() -> CategorySeries {
        CategorySeries {
            labels: vec!["A".to_string(), "B".to_string()],
            values: vec![15.0, 20000.0],
            population: 3,
        }
    }

    #[test]
    fn test_compile_bar_rects_and_labels() {
        let scene = compile_bar(&bars(), frame(), Orientation::Vertical);
        assert_eq!(scene.commands.len(), 4);
        match &scene.commands[0] {
            DrawCommand::DrawRect { tl, br, .. } => {
                assert_eq!(*tl, (-0.4, 15.0));
                assert_eq!(*br, (0.4, 0.0));
            }
            other => panic!("Expected DrawRect, got {:?}", other),
        }
        match &scene.commands[3] {
            DrawCommand::DrawText { text, .. } => assert_eq!(text, "20,000"),
            other => panic!("Expected DrawText, got {:?}", other),
        }
        assert!(scene.x_scale.is_categorical);
        assert_eq!(scene.y_scale.domain.0, 0.0);
    }

    #[test]
    fn test_compile_bar_horizontal_flips_axes() {
        let scene = compile_bar(&bars(), frame(), Orientation::Horizontal);
        assert!(scene.y_scale.is_categorical);
        assert!(!scene.x_scale.is_categorical);
        assert_eq!(scene.x_label.as_deref(), Some("amount"));
        assert_eq!(scene.y_label.as_deref(), Some("category"));
        match &scene.commands[1] {
            DrawCommand::DrawRect { tl, br, .. } => {
                assert_eq!(tl.0, 0.0);
                assert_eq!(br.0, 20000.0);
            }
            other => panic!("Expected DrawRect, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_pie_percent_labels() {
        let series = CategorySeries {
            labels: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            values: vec![1.0, 1.0, 2.0],
            population: 3,
        };
        let scene = compile_pie(&series, frame());
        assert!(!scene.show_axes);
        let polygons = scene
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawPolygon { .. }))
            .count();
        assert_eq!(polygons, 3);
        let texts: Vec<&str> = scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"25.0%"));
        assert!(texts.contains(&"50.0%"));

        // First slice starts at 12 o'clock
        if let DrawCommand::DrawPolygon { points, .. } = &scene.commands[0] {
            let (x, y) = points[1];
            assert!(x.abs() < 1e-9);
            assert!((y - 1.0).abs() < 1e-9);
        } else {
            panic!("Expected DrawPolygon");
        }
    }

    #[test]
    fn test_compile_heatmap_skips_undefined_cells() {
        let grid = HeatGrid {
            x_labels: vec!["SP".to_string(), "RJ".to_string()],
            y_labels: vec!["Jan".to_string()],
            cells: vec![vec![Some(3.0), None]],
            population: 2,
        };
        let scene = compile_heatmap(&grid, frame());
        let rects = scene
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawRect { .. }))
            .count();
        assert_eq!(rects, 1);
    }

    #[test]
    fn test_compile_box_geometry() {
        let series = BoxSeries {
            boxes: vec![BoxStats {
                label: "A".to_string(),
                lower_whisker: 1.0,
                q1: 2.0,
                median: 3.0,
                q3: 4.0,
                upper_whisker: 5.0,
                outliers: vec![10.0],
            }],
            population: 6,
        };
        let scene = compile_box(&series, frame());
        assert_eq!(scene.commands.len(), 7);
        match &scene.commands[4] {
            DrawCommand::DrawRect { tl, br, .. } => {
                assert_eq!(*tl, (-0.3, 4.0));
                assert_eq!(*br, (0.3, 2.0));
            }
            other => panic!("Expected DrawRect, got {:?}", other),
        }
        assert!(scene.y_scale.domain.1 > 10.0);
    }

    #[test]
    fn test_compile_histogram_rect_per_bin() {
        let bins = Bins {
            edges: vec![0.0, 5.0, 10.0],
            counts: vec![1, 3],
            density: Vec::new(),
            population: 4,
        };
        let scene = compile_histogram(&bins, frame());
        assert_eq!(scene.commands.len(), 2);
        assert_eq!(scene.y_label.as_deref(), Some("amount"));
    }

    #[test]
    fn test_compile_histogram_density_overlay() {
        let bins = Bins {
            edges: vec![0.0, 5.0, 10.0],
            counts: vec![1, 3],
            density: vec![(0.0, 0.5), (5.0, 4.5), (10.0, 2.0)],
            population: 4,
        };
        let scene = compile_histogram(&bins, frame());
        assert_eq!(scene.commands.len(), 3);
        assert!(matches!(scene.commands[2], DrawCommand::DrawLine { .. }));
        assert!(scene.y_scale.domain.1 >= 4.5);
    }

    #[test]
    fn test_compile_histogram_extreme_edges_stay_finite() {
        let bins = Bins {
            edges: vec![-1e308, 0.0, 1e308],
            counts: vec![1, 2],
            density: Vec::new(),
            population: 3,
        };
        let scene = compile_histogram(&bins, frame());
        let (lo, hi) = scene.x_scale.domain;
        assert!(lo.is_finite() && hi.is_finite());
        assert!(lo < -1e308 && hi > 1e308);
    }
}
