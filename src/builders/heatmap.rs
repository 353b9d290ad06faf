use super::{render, ChartOptions};
use crate::artifact::Artifact;
use crate::compiler;
use crate::data::ResultTable;
use crate::error::Result;
use crate::intent::{Aggregation, ChartKind};
use crate::shape::Grid;
use crate::transform;

/// Cells default to summing the value column.
pub fn build(table: &ResultTable, cols: Grid, opts: &ChartOptions) -> Result<Artifact> {
    let aggregation = opts.aggregation.unwrap_or(Aggregation::Sum);
    let grid = transform::heat_grid(table, cols, aggregation)?;

    let x = &table.column(cols.x).name;
    let y = &table.column(cols.y).name;
    let value = format!("{} of {}", aggregation, table.column(cols.value).name);
    let frame = opts.frame(format!("{} by {} and {}", value, x, y), x, y);

    let scene = compiler::compile_heatmap(&grid, frame);
    render(ChartKind::Heatmap, &scene, opts, grid.population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_heatmap_png() {
        let table = ResultTable::from_json(&json!([
            {"state": "SP", "month": "Jan", "orders": 5},
            {"state": "RJ", "month": "Jan", "orders": 3},
            {"state": "SP", "month": "Feb", "orders": 7},
            {"state": "SP", "month": "Feb", "orders": null},
        ]))
        .unwrap();
        let opts = ChartOptions {
            aggregation: Some(Aggregation::Mean),
            ..ChartOptions::default()
        };
        let artifact = build(&table, Grid { x: 0, y: 1, value: 2 }, &opts).unwrap();
        assert_eq!(artifact.rows_rendered, 3);
        assert_eq!(artifact.kind, ChartKind::Heatmap);
    }
}
