use super::{render, ChartOptions};
use crate::artifact::Artifact;
use crate::compiler;
use crate::data::ResultTable;
use crate::error::{ChartError, Result};
use crate::intent::ChartKind;
use crate::shape::CategoryValue;
use crate::transform;

/// Slices must be non-negative and sum to something positive.
pub fn build(table: &ResultTable, cols: CategoryValue, opts: &ChartOptions) -> Result<Artifact> {
    transform::ensure_non_negative(table, cols)?;
    let series = transform::category_series(table, cols, opts.aggregation)?;

    let value_name = &table.column(cols.value).name;
    let total: f64 = series.values.iter().sum();
    if total <= 0.0 {
        return Err(ChartError::value(value_name, "slices sum to zero"));
    }

    let category = &table.column(cols.category).name;
    let value = opts.value_label(value_name);
    let frame = opts.frame(format!("{} by {}", value, category), category, &value);

    let scene = compiler::compile_pie(&series, frame);
    render(ChartKind::Pie, &scene, opts, series.population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CV: CategoryValue = CategoryValue { category: 0, value: 1 };

    #[test]
    fn test_pie_png() {
        let table = ResultTable::from_json(&json!([
            {"state": "SP", "orders": 41746},
            {"state": "RJ", "orders": 12852},
            {"state": "MG", "orders": 11635},
        ]))
        .unwrap();
        let artifact = build(&table, CV, &ChartOptions::default()).unwrap();
        assert_eq!(artifact.rows_rendered, 3);
    }

    #[test]
    fn test_negative_slice_rejected() {
        let table = ResultTable::from_json(&json!([
            {"state": "SP", "orders": 5},
            {"state": "RJ", "orders": -1},
        ]))
        .unwrap();
        let err = build(&table, CV, &ChartOptions::default()).unwrap_err();
        assert!(matches!(err, ChartError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_total_rejected() {
        let table = ResultTable::from_json(&json!([
            {"state": "SP", "orders": 0},
            {"state": "RJ", "orders": 0},
        ]))
        .unwrap();
        let err = build(&table, CV, &ChartOptions::default()).unwrap_err();
        assert!(matches!(err, ChartError::InvalidValue { .. }));
    }
}
