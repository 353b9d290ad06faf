use super::{render, ChartOptions};
use crate::artifact::Artifact;
use crate::compiler;
use crate::data::ResultTable;
use crate::error::Result;
use crate::intent::ChartKind;
use crate::shape::CategoryValue;
use crate::transform;

pub fn build(table: &ResultTable, cols: CategoryValue, opts: &ChartOptions) -> Result<Artifact> {
    let series = transform::box_series(table, cols)?;

    let category = &table.column(cols.category).name;
    let value = &table.column(cols.value).name;
    let frame = opts.frame(format!("{} by {}", value, category), category, value);

    let scene = compiler::compile_box(&series, frame);
    render(ChartKind::Box, &scene, opts, series.population)
}
