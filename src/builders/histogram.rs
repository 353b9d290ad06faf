use super::{render, ChartOptions};
use crate::artifact::Artifact;
use crate::compiler;
use crate::data::ResultTable;
use crate::error::Result;
use crate::intent::ChartKind;
use crate::transform;

pub fn build(table: &ResultTable, value: usize, opts: &ChartOptions) -> Result<Artifact> {
    let bins = transform::histogram_bins(table, value, opts.bins)?;

    let name = &table.column(value).name;
    let frame = opts.frame(format!("Distribution of {}", name), name, "Frequency");

    let scene = compiler::compile_histogram(&bins, frame);
    render(ChartKind::Histogram, &scene, opts, bins.population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_histogram_png() {
        let rows: Vec<Value> = (0..100).map(|i| json!({"price": (i * 7 % 53) as f64 + 0.5})).collect();
        let table = ResultTable::from_json(&Value::Array(rows)).unwrap();
        let opts = ChartOptions {
            bins: 10,
            ..ChartOptions::default()
        };
        let artifact = build(&table, 0, &opts).unwrap();
        assert_eq!(artifact.rows_rendered, 100);
    }

    #[test]
    fn test_constant_column_renders() {
        let table = ResultTable::from_json(&json!([{"price": 3}, {"price": 3}])).unwrap();
        assert!(build(&table, 0, &ChartOptions::default()).is_ok());
    }
}
