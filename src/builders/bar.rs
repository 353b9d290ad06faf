use tracing::debug;

use super::{render, ChartOptions};
use crate::artifact::Artifact;
use crate::compiler;
use crate::data::ResultTable;
use crate::error::Result;
use crate::intent::ChartKind;
use crate::shape::CategoryValue;
use crate::transform;

pub fn build(table: &ResultTable, cols: CategoryValue, opts: &ChartOptions) -> Result<Artifact> {
    let series = transform::category_series(table, cols, opts.aggregation)?;
    debug!(bars = series.values.len(), rows = series.population, "bar series");

    let category = &table.column(cols.category).name;
    let value = opts.value_label(&table.column(cols.value).name);
    let frame = opts.frame(format!("{} by {}", value, category), category, &value);

    let scene = compiler::compile_bar(&series, frame, opts.orientation);
    render(ChartKind::Bar, &scene, opts, series.population)
}
