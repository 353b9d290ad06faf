// CSV input for result tables exported from a SQL client

use csv::ReaderBuilder;
use std::io::Read;

use crate::data::{ResultTable, Scalar};
use crate::error::{ChartError, Result};

/// Read a headed CSV document into a table, inferring column types.
///
/// Empty cells become nulls. Rows shorter than the header are padded with nulls.
pub fn read_csv<R: Read>(reader: R, categorical_max_distinct: usize) -> Result<ResultTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ChartError::MalformedTable(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| {
            ChartError::MalformedTable(format!("Failed to read CSV record {}: {}", idx + 1, e))
        })?;
        if record.len() > headers.len() {
            return Err(ChartError::MalformedTable(format!(
                "CSV record {} has {} fields, expected {}",
                idx + 1,
                record.len(),
                headers.len()
            )));
        }
        let row = (0..headers.len())
            .map(|i| match record.get(i) {
                Some(cell) if !cell.is_empty() => Scalar::Text(cell.to_string()),
                _ => Scalar::Null,
            })
            .collect();
        rows.push(row);
    }

    ResultTable::infer(headers, rows, categorical_max_distinct)
}

pub fn read_csv_str(text: &str, categorical_max_distinct: usize) -> Result<ResultTable> {
    read_csv(text.as_bytes(), categorical_max_distinct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnType, DEFAULT_CATEGORICAL_MAX_DISTINCT};

    #[test]
    fn test_read_csv_infers_types() {
        let csv = "category,amount,day\nA,10,2017-01-02\nB,20.5,2017-01-03\nA,,2017-01-04\n";
        let table = read_csv_str(csv, DEFAULT_CATEGORICAL_MAX_DISTINCT).unwrap();
        assert_eq!(table.len(), 3);
        let types: Vec<ColumnType> = table.columns().iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![ColumnType::Categorical, ColumnType::Numeric, ColumnType::Temporal]
        );
        assert_eq!(table.value(1, 1), &Scalar::Number(20.5));
        assert!(table.value(2, 1).is_null());
    }

    #[test]
    fn test_short_rows_padded() {
        let csv = "a,b\n1\n2,3\n";
        let table = read_csv_str(csv, DEFAULT_CATEGORICAL_MAX_DISTINCT).unwrap();
        assert!(table.value(0, 1).is_null());
    }

    #[test]
    fn test_long_rows_rejected() {
        let csv = "a,b\n1,2,3\n";
        let err = read_csv_str(csv, DEFAULT_CATEGORICAL_MAX_DISTINCT).unwrap_err();
        assert!(matches!(err, ChartError::MalformedTable(_)));
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = read_csv_str("state,orders\n", DEFAULT_CATEGORICAL_MAX_DISTINCT).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 2);
    }
}
