// Column-shape validation: maps an intent's column names onto typed roles

use tracing::debug;

use crate::data::{ColumnType, ResultTable};
use crate::error::{ChartError, Result};
use crate::intent::{ChartIntent, ChartKind};

/// One grouping column plus the numeric column it summarises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryValue {
    pub category: usize,
    pub value: usize,
}

/// Position columns of a line or scatter chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XY {
    pub x: usize,
    pub y: usize,
}

/// Two axis columns and the cell value of a heatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub x: usize,
    pub y: usize,
    pub value: usize,
}

/// A validated routing decision: one variant per chart kind, carrying
/// the table column indices in the roles that kind needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartPlan {
    Bar(CategoryValue),
    Line(XY),
    Pie(CategoryValue),
    Histogram { value: usize },
    Heatmap(Grid),
    Scatter(XY),
    Box(CategoryValue),
}

impl ChartPlan {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartPlan::Bar(_) => ChartKind::Bar,
            ChartPlan::Line(_) => ChartKind::Line,
            ChartPlan::Pie(_) => ChartKind::Pie,
            ChartPlan::Histogram { .. } => ChartKind::Histogram,
            ChartPlan::Heatmap(_) => ChartKind::Heatmap,
            ChartPlan::Scatter(_) => ChartKind::Scatter,
            ChartPlan::Box(_) => ChartKind::Box,
        }
    }

    /// Column indices the plan reads, in role order.
    pub fn columns(&self) -> Vec<usize> {
        match *self {
            ChartPlan::Bar(cv) | ChartPlan::Pie(cv) | ChartPlan::Box(cv) => vec![cv.category, cv.value],
            ChartPlan::Line(xy) | ChartPlan::Scatter(xy) => vec![xy.x, xy.y],
            ChartPlan::Histogram { value } => vec![value],
            ChartPlan::Heatmap(g) => vec![g.x, g.y, g.value],
        }
    }
}

/// Number of columns each kind takes
pub fn expected_columns(kind: ChartKind) -> usize {
    match kind {
        ChartKind::Histogram => 1,
        ChartKind::Heatmap => 3,
        ChartKind::Bar | ChartKind::Line | ChartKind::Pie | ChartKind::Scatter | ChartKind::Box => 2,
    }
}

/// Validate `intent` against `table`'s columns and resolve the column roles.
///
/// Checks run in order: every name exists (`UnknownColumn`), then the
/// per-kind count and type table (`InvalidColumnShape`).
pub fn plan(intent: &ChartIntent, table: &ResultTable) -> Result<ChartPlan> {
    let mut indices = Vec::with_capacity(intent.columns.len());
    for name in &intent.columns {
        let idx = table
            .column_index(name)
            .ok_or_else(|| ChartError::UnknownColumn(name.clone()))?;
        indices.push(idx);
    }

    let kind = intent.kind;
    let expected = expected_columns(kind);
    if indices.len() != expected {
        return Err(ChartError::shape(
            kind,
            format!("expected {} column(s), got {}", expected, indices.len()),
        ));
    }
    for (i, idx) in indices.iter().enumerate() {
        if indices[..i].contains(idx) {
            return Err(ChartError::shape(
                kind,
                format!("column '{}' is selected more than once", table.column(*idx).name),
            ));
        }
    }

    let mut types: Vec<ColumnType> = indices.iter().map(|&i| table.column(i).column_type).collect();
    let all_null: Vec<bool> = indices.iter().map(|&i| !table.has_values(i)).collect();
    if all_null.contains(&true) {
        assume_fitting_types(kind, &mut types, &all_null);
    }

    let plan = match kind {
        ChartKind::Bar => ChartPlan::Bar(category_value(kind, &indices, &types)?),
        ChartKind::Pie => ChartPlan::Pie(category_value(kind, &indices, &types)?),
        ChartKind::Box => ChartPlan::Box(category_value(kind, &indices, &types)?),
        ChartKind::Line => ChartPlan::Line(line_axes(&indices, &types)?),
        ChartKind::Scatter => {
            if types.iter().any(|t| *t != ColumnType::Numeric) {
                return Err(ChartError::shape(
                    kind,
                    format!("both columns must be numeric, got {} and {}", types[0], types[1]),
                ));
            }
            ChartPlan::Scatter(XY {
                x: indices[0],
                y: indices[1],
            })
        }
        ChartKind::Histogram => {
            if types[0] != ColumnType::Numeric {
                return Err(ChartError::shape(
                    kind,
                    format!("column must be numeric, got {}", types[0]),
                ));
            }
            ChartPlan::Histogram { value: indices[0] }
        }
        ChartKind::Heatmap => ChartPlan::Heatmap(grid(&indices, &types)?),
    };

    debug!(kind = %kind, columns = ?plan.columns(), "resolved column roles");
    Ok(plan)
}

/// Give columns without a single value the type their role needs.
///
/// Such a column cannot be typed from its data, and null exclusion leaves
/// nothing to draw anyway, so the request should end in `EmptyResult`.
fn assume_fitting_types(kind: ChartKind, types: &mut [ColumnType], all_null: &[bool]) {
    let numeric_needed = match kind {
        ChartKind::Scatter => 2,
        ChartKind::Histogram
        | ChartKind::Bar
        | ChartKind::Line
        | ChartKind::Pie
        | ChartKind::Box
        | ChartKind::Heatmap => 1,
    };
    let mut numeric = types
        .iter()
        .zip(all_null)
        .filter(|&(t, empty)| !*empty && *t == ColumnType::Numeric)
        .count();
    for (t, &empty) in types.iter_mut().zip(all_null) {
        if !empty {
            continue;
        }
        if numeric < numeric_needed {
            *t = ColumnType::Numeric;
            numeric += 1;
        } else {
            *t = ColumnType::Categorical;
        }
    }
}

fn category_value(kind: ChartKind, indices: &[usize], types: &[ColumnType]) -> Result<CategoryValue> {
    match (types[0], types[1]) {
        (c, ColumnType::Numeric) if c.is_discrete() => Ok(CategoryValue {
            category: indices[0],
            value: indices[1],
        }),
        (ColumnType::Numeric, c) if c.is_discrete() => Ok(CategoryValue {
            category: indices[1],
            value: indices[0],
        }),
        (ColumnType::Numeric, ColumnType::Numeric) => Err(ChartError::shape(
            kind,
            "needs one categorical column, got two numeric columns",
        )),
        (a, b) => Err(ChartError::shape(
            kind,
            format!("needs one numeric column, got {} and {}", a, b),
        )),
    }
}

fn line_axes(indices: &[usize], types: &[ColumnType]) -> Result<XY> {
    let kind = ChartKind::Line;
    match (types[0], types[1]) {
        (ColumnType::Text, _) => Err(ChartError::shape(
            kind,
            "x column must be temporal, numeric or ordinal, got text",
        )),
        (_, ColumnType::Numeric) => Ok(XY {
            x: indices[0],
            y: indices[1],
        }),
        (ColumnType::Numeric, ColumnType::Temporal | ColumnType::Categorical) => Ok(XY {
            x: indices[1],
            y: indices[0],
        }),
        (a, b) => Err(ChartError::shape(
            kind,
            format!("needs a numeric y column, got {} and {}", a, b),
        )),
    }
}

fn grid(indices: &[usize], types: &[ColumnType]) -> Result<Grid> {
    let kind = ChartKind::Heatmap;
    let numeric: Vec<usize> = (0..3).filter(|&i| types[i] == ColumnType::Numeric).collect();
    if numeric.len() != 1 {
        return Err(ChartError::shape(
            kind,
            format!(
                "needs two categorical axis columns and one numeric value column, got {} numeric",
                numeric.len()
            ),
        ));
    }
    let value_pos = numeric[0];
    let axes: Vec<usize> = (0..3).filter(|&i| i != value_pos).collect();
    Ok(Grid {
        x: indices[axes[0]],
        y: indices[axes[1]],
        value: indices[value_pos],
    })
}
