use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ChartError, Result};

/// String columns with at most this many distinct values are treated as categorical.
pub const DEFAULT_CATEGORICAL_MAX_DISTINCT: usize = 50;

/// Inferred scalar type of a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Temporal,
    Text,
}

impl ColumnType {
    /// Can this column act as a grouping / category axis?
    pub fn is_discrete(self) -> bool {
        !matches!(self, ColumnType::Numeric)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Temporal => "temporal",
            ColumnType::Text => "text",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A single cell of a query result
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Label used for grouping (exact string equality) and axis ticks.
    pub fn label(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => format_number(*n),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn from_json(value: &Value, column: &str) -> Result<Self> {
        match value {
            Value::Null => Ok(Scalar::Null),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number).ok_or_else(|| {
                ChartError::MalformedTable(format!("Number out of range in column '{}'", column))
            }),
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(ChartError::MalformedTable(format!(
                "Unsupported nested value for field '{}'",
                column
            ))),
        }
    }
}

/// Render a number without a trailing ".0" for integral values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse the date/time spellings a SQL result typically carries.
pub fn parse_temporal(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    // Monthly buckets ("2017-03") are common in GROUP BY output
    if s.len() == 7 {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Tabular output of one query execution.
///
/// Rows are stored positionally, aligned with `columns`. Immutable once built.
#[derive(Debug, Clone)]
pub struct ResultTable {
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<Scalar>>,
}

impl ResultTable {
    /// Build a table from declared column metadata
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Vec<Scalar>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(ChartError::MalformedTable(format!(
                    "Duplicate column name '{}'",
                    col.name
                )));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ChartError::MalformedTable(format!(
                    "Row {} has {} values, expected {}",
                    idx + 1,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a table whose column types are inferred from the values.
    ///
    /// Numeric columns have numeric strings coerced to numbers.
    pub fn infer(
        names: Vec<String>,
        rows: Vec<Vec<Scalar>>,
        categorical_max_distinct: usize,
    ) -> Result<Self> {
        let declared = vec![None; names.len()];
        Self::infer_undeclared(names, declared, rows, categorical_max_distinct)
    }

    /// Like [`ResultTable::infer`], but columns with a declared type keep it.
    pub fn infer_undeclared(
        names: Vec<String>,
        declared: Vec<Option<ColumnType>>,
        mut rows: Vec<Vec<Scalar>>,
        categorical_max_distinct: usize,
    ) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, (name, declared)) in names.into_iter().zip(declared).enumerate() {
            let column_type = match declared {
                Some(t) => t,
                None => infer_column_type(
                    rows.iter().filter_map(|r| r.get(idx)),
                    categorical_max_distinct,
                ),
            };
            if column_type == ColumnType::Numeric {
                for row in rows.iter_mut() {
                    if let Some(cell) = row.get_mut(idx) {
                        coerce_numeric(cell);
                    }
                }
            }
            columns.push(ColumnDef { name, column_type });
        }
        Self::new(columns, rows)
    }

    /// Create a table from a JSON payload, inferring column types.
    ///
    /// Accepts an array of row objects, a JSON string holding such an array,
    /// or an object with `columns` and `rows`.
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::from_json_with(value, DEFAULT_CATEGORICAL_MAX_DISTINCT)
    }

    pub fn from_json_with(value: &Value, categorical_max_distinct: usize) -> Result<Self> {
        match value {
            Value::String(text) => {
                let parsed: Value = serde_json::from_str(text).map_err(|e| {
                    ChartError::MalformedTable(format!("Could not parse data as JSON: {}", e))
                })?;
                if parsed.is_string() {
                    return Err(ChartError::MalformedTable(
                        "Data must be a JSON array or object".to_string(),
                    ));
                }
                Self::from_json_with(&parsed, categorical_max_distinct)
            }
            Value::Array(items) => from_row_objects(items, categorical_max_distinct),
            Value::Object(obj) => from_columns_and_rows(obj, categorical_max_distinct),
            _ => Err(ChartError::MalformedTable(
                "Input data must be a JSON array of objects".to_string(),
            )),
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a column by exact name, falling back to a unique case-insensitive match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        if let Some(idx) = self.columns.iter().position(|c| c.name == name) {
            return Some(idx);
        }
        let mut matches = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name.eq_ignore_ascii_case(name));
        match (matches.next(), matches.next()) {
            (Some((idx, _)), None) => Some(idx),
            _ => None,
        }
    }

    pub fn column(&self, idx: usize) -> &ColumnDef {
        &self.columns[idx]
    }

    pub fn value(&self, row: usize, col: usize) -> &Scalar {
        &self.rows[row][col]
    }

    /// True if column `col` holds at least one non-null value
    pub fn has_values(&self, col: usize) -> bool {
        self.rows.iter().any(|row| !row[col].is_null())
    }
}

fn from_row_objects(items: &[Value], categorical_max_distinct: usize) -> Result<ResultTable> {
    let Some(first) = items.first() else {
        return ResultTable::new(Vec::new(), Vec::new());
    };
    let first_obj = first
        .as_object()
        .ok_or_else(|| ChartError::MalformedTable("Items in array must be objects".to_string()))?;
    let headers: Vec<String> = first_obj.keys().cloned().collect();

    let mut rows = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| {
            ChartError::MalformedTable("Items in array must be objects".to_string())
        })?;
        if obj.len() != headers.len() || headers.iter().any(|h| !obj.contains_key(h)) {
            return Err(ChartError::MalformedTable(format!(
                "Row {} does not have the same columns as the first row",
                idx + 1
            )));
        }
        let mut row = Vec::with_capacity(headers.len());
        for header in &headers {
            row.push(Scalar::from_json(&obj[header], header)?);
        }
        rows.push(row);
    }

    ResultTable::infer(headers, rows, categorical_max_distinct)
}

/// One entry of a `columns` array: a bare name, or `{name, type?}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Name(String),
    Object {
        name: String,
        #[serde(rename = "type", default)]
        column_type: Option<Value>,
    },
}

impl ColumnSpec {
    fn resolve(self) -> Result<(String, Option<ColumnType>)> {
        match self {
            ColumnSpec::Name(name) => Ok((name, None)),
            ColumnSpec::Object {
                name,
                column_type: None | Some(Value::Null),
            } => Ok((name, None)),
            ColumnSpec::Object {
                name,
                column_type: Some(raw),
            } => {
                let column_type = serde_json::from_value::<ColumnType>(raw.clone()).map_err(|_| {
                    ChartError::MalformedTable(format!(
                        "Column '{}' has unknown type {}; expected numeric, categorical, temporal or text",
                        name, raw
                    ))
                })?;
                Ok((name, Some(column_type)))
            }
        }
    }
}

fn from_columns_and_rows(
    obj: &Map<String, Value>,
    categorical_max_distinct: usize,
) -> Result<ResultTable> {
    let columns_value = obj.get("columns").ok_or_else(|| {
        ChartError::MalformedTable("Object input must have 'columns' and 'rows'".to_string())
    })?;
    let specs: Vec<ColumnSpec> = serde_json::from_value(columns_value.clone())
        .map_err(|e| ChartError::MalformedTable(format!("Invalid column metadata: {}", e)))?;

    let (names, declared): (Vec<String>, Vec<Option<ColumnType>>) = specs
        .into_iter()
        .map(ColumnSpec::resolve)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();

    let empty: Vec<Value> = Vec::new();
    let raw_rows = match obj.get("rows") {
        Some(Value::Array(rows)) => rows,
        Some(Value::Null) | None => &empty,
        Some(_) => {
            return Err(ChartError::MalformedTable("'rows' must be an array".to_string()));
        }
    };

    let mut rows = Vec::with_capacity(raw_rows.len());
    for (idx, raw) in raw_rows.iter().enumerate() {
        let row = match raw {
            Value::Array(cells) => {
                if cells.len() != names.len() {
                    return Err(ChartError::MalformedTable(format!(
                        "Row {} has {} values, expected {}",
                        idx + 1,
                        cells.len(),
                        names.len()
                    )));
                }
                cells
                    .iter()
                    .zip(&names)
                    .map(|(cell, name)| Scalar::from_json(cell, name))
                    .collect::<Result<Vec<_>>>()?
            }
            Value::Object(cells) => {
                if cells.len() != names.len() {
                    return Err(ChartError::MalformedTable(format!(
                        "Row {} does not match the declared columns",
                        idx + 1
                    )));
                }
                names
                    .iter()
                    .map(|name| {
                        let cell = cells.get(name).ok_or_else(|| {
                            ChartError::MalformedTable(format!(
                                "Row {} is missing column '{}'",
                                idx + 1,
                                name
                            ))
                        })?;
                        Scalar::from_json(cell, name)
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            _ => {
                return Err(ChartError::MalformedTable(format!(
                    "Row {} must be an array or object",
                    idx + 1
                )))
            }
        };
        rows.push(row);
    }

    ResultTable::infer_undeclared(names, declared, rows, categorical_max_distinct)
}

fn coerce_numeric(cell: &mut Scalar) {
    if let Scalar::Text(s) = cell {
        if let Ok(n) = s.trim().parse::<f64>() {
            *cell = Scalar::Number(n);
        }
    }
}

fn infer_column_type<'a, I>(values: I, categorical_max_distinct: usize) -> ColumnType
where
    I: Iterator<Item = &'a Scalar>,
{
    let mut all_numeric = true;
    let mut all_temporal = true;
    let mut any_text = false;
    let mut any_value = false;
    let mut distinct: HashSet<String> = HashSet::new();

    for value in values {
        match value {
            Scalar::Null => continue,
            Scalar::Number(_) => {
                all_temporal = false;
            }
            Scalar::Bool(b) => {
                all_numeric = false;
                all_temporal = false;
                distinct.insert(b.to_string());
            }
            Scalar::Text(s) => {
                any_text = true;
                if s.trim().parse::<f64>().is_err() {
                    all_numeric = false;
                }
                if all_temporal && parse_temporal(s).is_none() {
                    all_temporal = false;
                }
                distinct.insert(s.clone());
            }
        }
        any_value = true;
    }

    if !any_value {
        return ColumnType::Categorical;
    }
    if all_numeric {
        return ColumnType::Numeric;
    }
    if all_temporal && any_text {
        return ColumnType::Temporal;
    }
    if distinct.len() <= categorical_max_distinct {
        ColumnType::Categorical
    } else {
        ColumnType::Text
    }
}
