use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::ir::{DrawCommand, Scale, SceneGraph};
use crate::palette::STEELBLUE;
use crate::scale::tick_label;
use crate::OutputFormat;

/// Style for polyline primitives
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: RGBColor,
    pub width: u32,
    pub alpha: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: STEELBLUE,
            width: 2,
            alpha: 1.0,
        }
    }
}

/// Style for point markers
#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub color: RGBColor,
    pub size: u32,
    pub alpha: f64,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            color: STEELBLUE,
            size: 4,
            alpha: 0.6,
        }
    }
}

/// Style for filled rectangles and polygons
#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub fill: RGBColor,
    pub alpha: f64,
    pub border: Option<RGBColor>,
}

impl Default for FillStyle {
    fn default() -> Self {
        Self {
            fill: STEELBLUE,
            alpha: 1.0,
            border: None,
        }
    }
}

/// Where a label sits relative to its anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    /// Just above the point, e.g. a value on top of a vertical bar
    Above,
    /// Just right of the point, e.g. a value past the end of a horizontal bar
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub color: RGBColor,
    pub size: u32,
    pub anchor: Anchor,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            color: BLACK,
            size: 12,
            anchor: Anchor::Center,
        }
    }
}

impl Anchor {
    fn pos(self) -> Pos {
        match self {
            Anchor::Center => Pos::new(HPos::Center, VPos::Center),
            Anchor::Above => Pos::new(HPos::Center, VPos::Bottom),
            Anchor::Right => Pos::new(HPos::Left, VPos::Center),
        }
    }
}

/// Largest width or height accepted for a rendered image
pub const MAX_IMAGE_SIDE: u32 = 8192;

/// Execute a scene graph and encode the result.
pub fn render_scene(scene: &SceneGraph, format: OutputFormat) -> Result<Vec<u8>> {
    if scene.width == 0 || scene.height == 0 {
        anyhow::bail!("Cannot render a {}x{} image", scene.width, scene.height);
    }
    if scene.width > MAX_IMAGE_SIDE || scene.height > MAX_IMAGE_SIDE {
        anyhow::bail!(
            "Image size {}x{} exceeds the {}px limit",
            scene.width,
            scene.height,
            MAX_IMAGE_SIDE
        );
    }
    check_domain("x", &scene.x_scale)?;
    check_domain("y", &scene.y_scale)?;

    match format {
        OutputFormat::Png => {
            let len = (scene.width as usize)
                .checked_mul(scene.height as usize)
                .and_then(|px| px.checked_mul(3))
                .ok_or_else(|| anyhow::anyhow!("Image size {}x{} is too large", scene.width, scene.height))?;
            let mut buffer = vec![0u8; len];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (scene.width, scene.height))
                    .into_drawing_area();
                draw_scene(&root, scene)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, scene.width, scene.height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (scene.width, scene.height))
                    .into_drawing_area();
                draw_scene(&root, scene)?;
                root.present().context("Failed to present drawing")?;
            }
            Ok(svg.into_bytes())
        }
    }
}

/// Plotters cannot map onto an empty, reversed or unbounded axis.
fn check_domain(axis: &str, scale: &Scale) -> Result<()> {
    let (lo, hi) = scale.domain;
    if !(lo.is_finite() && hi.is_finite() && (hi - lo).is_finite() && hi > lo) {
        anyhow::bail!("Cannot draw the {} axis over [{}, {}]", axis, lo, hi);
    }
    Ok(())
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

fn draw_scene<DB>(root: &DrawingArea<DB, Shift>, scene: &SceneGraph) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    let (x0, x1) = scene.x_scale.domain;
    let (y0, y1) = scene.y_scale.domain;

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(10)
        .caption(scene.title.as_str(), ("sans-serif", 20));
    if scene.show_axes {
        builder.x_label_area_size(50).y_label_area_size(70);
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, y0..y1)
        .context("Failed to build chart")?;

    if scene.show_axes {
        let x_fmt = |v: &f64| tick_label(&scene.x_scale, *v);
        let y_fmt = |v: &f64| tick_label(&scene.y_scale, *v);
        let mut mesh = chart.configure_mesh();
        mesh.x_label_formatter(&x_fmt).y_label_formatter(&y_fmt);
        if scene.x_scale.is_categorical {
            mesh.x_labels(scene.x_scale.categories.len().max(1)).disable_x_mesh();
        }
        if scene.y_scale.is_categorical {
            mesh.y_labels(scene.y_scale.categories.len().max(1)).disable_y_mesh();
        }
        if let Some(label) = &scene.x_label {
            mesh.x_desc(label.as_str());
        }
        if let Some(label) = &scene.y_label {
            mesh.y_desc(label.as_str());
        }
        mesh.draw().context("Failed to draw mesh")?;
    }

    for command in &scene.commands {
        match command {
            DrawCommand::DrawLine { points, style } => {
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        points.clone(),
                        style.color.mix(style.alpha).stroke_width(style.width),
                    )))
                    .context("Failed to draw line")?;
            }
            DrawCommand::DrawPoint { points, style } => {
                let fill = style.color.mix(style.alpha).filled();
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), style.size as i32, fill)),
                    )
                    .context("Failed to draw points")?;
            }
            DrawCommand::DrawRect { tl, br, style } => {
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [*tl, *br],
                        style.fill.mix(style.alpha).filled(),
                    )))
                    .context("Failed to draw rectangle")?;
                if let Some(border) = style.border {
                    chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [*tl, *br],
                            border.stroke_width(1),
                        )))
                        .context("Failed to draw rectangle border")?;
                }
            }
            DrawCommand::DrawPolygon { points, style } => {
                chart
                    .draw_series(std::iter::once(Polygon::new(
                        points.clone(),
                        style.fill.mix(style.alpha).filled(),
                    )))
                    .context("Failed to draw polygon")?;
                if let Some(border) = style.border {
                    let mut outline = points.clone();
                    if let Some(&first) = points.first() {
                        outline.push(first);
                    }
                    chart
                        .draw_series(std::iter::once(PathElement::new(
                            outline,
                            border.stroke_width(1),
                        )))
                        .context("Failed to draw polygon border")?;
                }
            }
            DrawCommand::DrawText { at, text, style } => {
                let text_style = ("sans-serif", style.size as f64)
                    .into_font()
                    .color(&style.color)
                    .pos(style.anchor.pos());
                chart
                    .draw_series(std::iter::once(Text::new(text.clone(), *at, text_style)))
                    .context("Failed to draw label")?;
            }
        }
    }

    Ok(())
}
