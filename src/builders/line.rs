use super::{render, ChartOptions};
use crate::artifact::Artifact;
use crate::compiler;
use crate::data::ResultTable;
use crate::error::Result;
use crate::intent::ChartKind;
use crate::shape::XY;
use crate::transform;

pub fn build(table: &ResultTable, cols: XY, opts: &ChartOptions) -> Result<Artifact> {
    let series = transform::line_series(table, cols, opts.aggregation)?;

    let x = &table.column(cols.x).name;
    let y = opts.value_label(&table.column(cols.y).name);
    let frame = opts.frame(format!("{} over {}", y, x), x, &y);

    let scene = compiler::compile_line(&series, frame);
    render(ChartKind::Line, &scene, opts, series.population)
}
