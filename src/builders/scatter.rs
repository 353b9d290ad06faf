use super::{render, ChartOptions};
use crate::artifact::Artifact;
use crate::compiler;
use crate::data::ResultTable;
use crate::error::Result;
use crate::intent::ChartKind;
use crate::shape::XY;
use crate::transform;

pub fn build(table: &ResultTable, cols: XY, opts: &ChartOptions) -> Result<Artifact> {
    let series = transform::scatter_series(table, cols)?;

    let x = &table.column(cols.x).name;
    let y = &table.column(cols.y).name;
    let frame = opts.frame(format!("{} vs {}", y, x), x, y);

    let scene = compiler::compile_scatter(&series, frame);
    render(ChartKind::Scatter, &scene, opts, series.population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scatter_skips_null_pairs() {
        let table = ResultTable::from_json(&json!([
            {"price": 10.0, "freight": 1.5},
            {"price": 25.0, "freight": null},
            {"price": 40.0, "freight": 3.0},
        ]))
        .unwrap();
        let artifact = build(&table, XY { x: 0, y: 1 }, &ChartOptions::default()).unwrap();
        assert_eq!(artifact.rows_rendered, 2);
    }
}
