use std::collections::HashMap;

use crate::data::{parse_temporal, ColumnType, ResultTable, Scalar};
use crate::error::{ChartError, Result};
use crate::intent::Aggregation;
use crate::ir::{AxisKind, Bins, BoxSeries, BoxStats, CategorySeries, HeatGrid, PointSeries};
use crate::shape::{CategoryValue, Grid, XY};

/// Rows with a non-null value in every selected column.
///
/// Fails with `EmptyResult` when exclusion leaves nothing to draw.
pub fn render_population(table: &ResultTable, columns: &[usize]) -> Result<Vec<usize>> {
    let rows: Vec<usize> = (0..table.len())
        .filter(|&r| columns.iter().all(|&c| !table.value(r, c).is_null()))
        .collect();
    if rows.is_empty() {
        return Err(ChartError::EmptyResult);
    }
    Ok(rows)
}

fn number(table: &ResultTable, row: usize, col: usize) -> Result<f64> {
    let name = &table.column(col).name;
    match table.value(row, col) {
        Scalar::Number(n) if n.is_finite() => Ok(*n),
        Scalar::Number(n) => Err(ChartError::value(name, format!("non-finite value {} at row {}", n, row + 1))),
        other => Err(ChartError::value(
            name,
            format!("'{}' at row {} is not a number", other.label(), row + 1),
        )),
    }
}

/// Running state for one group under an aggregation
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    fn finish(&self, agg: Aggregation) -> f64 {
        match agg {
            Aggregation::Sum => self.sum,
            Aggregation::Mean => self.sum / self.count as f64,
            Aggregation::Count => self.count as f64,
        }
    }
}

/// Group `(key, value)` pairs by exact key equality, keeping first-seen key order.
fn aggregate(pairs: Vec<(String, f64)>, agg: Aggregation) -> (Vec<String>, Vec<f64>) {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Accumulator> = HashMap::new();
    for (key, v) in pairs {
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(v);
    }
    let values = order.iter().map(|k| groups[k].finish(agg)).collect();
    (order, values)
}

/// Extract labelled values for bar/pie charts.
///
/// With an aggregation there is one entry per distinct category in first-seen
/// order; without one, one entry per surviving row in table order.
pub fn category_series(
    table: &ResultTable,
    cols: CategoryValue,
    aggregation: Option<Aggregation>,
) -> Result<CategorySeries> {
    let rows = render_population(table, &[cols.category, cols.value])?;
    let mut pairs = Vec::with_capacity(rows.len());
    for &r in &rows {
        pairs.push((table.value(r, cols.category).label(), number(table, r, cols.value)?));
    }

    let (labels, values) = match aggregation {
        Some(agg) => aggregate(pairs, agg),
        None => pairs.into_iter().unzip(),
    };

    Ok(CategorySeries {
        labels,
        values,
        population: rows.len(),
    })
}

/// Fail with `InvalidValue` if any value in the render population is negative.
pub fn ensure_non_negative(table: &ResultTable, cols: CategoryValue) -> Result<()> {
    let rows = render_population(table, &[cols.category, cols.value])?;
    for r in rows {
        let v = number(table, r, cols.value)?;
        if v < 0.0 {
            return Err(ChartError::value(
                &table.column(cols.value).name,
                format!("negative value {} at row {} cannot be a pie slice", v, r + 1),
            ));
        }
    }
    Ok(())
}

/// Extract points for a line chart.
///
/// Numeric and temporal x values are sorted ascending; categorical x values
/// keep first-seen order. An aggregation groups rows sharing the same x label.
pub fn line_series(
    table: &ResultTable,
    cols: XY,
    aggregation: Option<Aggregation>,
) -> Result<PointSeries> {
    let rows = render_population(table, &[cols.x, cols.y])?;
    let mut pairs = Vec::with_capacity(rows.len());
    for &r in &rows {
        pairs.push((table.value(r, cols.x).label(), number(table, r, cols.y)?));
    }
    let (labels, ys) = match aggregation {
        Some(agg) => aggregate(pairs, agg),
        None => pairs.into_iter().unzip(),
    };

    let x_name = &table.column(cols.x).name;
    let (x_axis, xs) = match table.column(cols.x).column_type {
        ColumnType::Numeric => {
            let xs = labels
                .iter()
                .map(|l| {
                    l.parse::<f64>()
                        .map_err(|_| ChartError::value(x_name, format!("'{}' is not a number", l)))
                })
                .collect::<Result<Vec<f64>>>()?;
            (AxisKind::Continuous, xs)
        }
        ColumnType::Temporal => {
            let xs = labels
                .iter()
                .map(|l| {
                    parse_temporal(l)
                        .map(|dt| dt.and_utc().timestamp() as f64)
                        .ok_or_else(|| ChartError::value(x_name, format!("'{}' is not a date", l)))
                })
                .collect::<Result<Vec<f64>>>()?;
            (AxisKind::Temporal, xs)
        }
        ColumnType::Categorical | ColumnType::Text => {
            let mut categories: Vec<String> = Vec::new();
            let mut xs = Vec::with_capacity(labels.len());
            for l in &labels {
                let idx = match categories.iter().position(|c| c == l) {
                    Some(i) => i,
                    None => {
                        categories.push(l.clone());
                        categories.len() - 1
                    }
                };
                xs.push(idx as f64);
            }
            (AxisKind::Categorical(categories), xs)
        }
    };

    let mut points: Vec<(f64, f64)> = xs.into_iter().zip(ys).collect();
    if !matches!(x_axis, AxisKind::Categorical(_)) {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
    }
    let (x, y) = points.into_iter().unzip();

    Ok(PointSeries {
        x,
        y,
        x_axis,
        population: rows.len(),
    })
}

/// Extract raw points for a scatter plot, in table order.
pub fn scatter_series(table: &ResultTable, cols: XY) -> Result<PointSeries> {
    let rows = render_population(table, &[cols.x, cols.y])?;
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    for &r in &rows {
        x.push(number(table, r, cols.x)?);
        y.push(number(table, r, cols.y)?);
    }
    Ok(PointSeries {
        x,
        y,
        x_axis: AxisKind::Continuous,
        population: rows.len(),
    })
}

/// Bin a numeric column into `bin_count` equal-width bins over [min, max].
///
/// The last bin is closed on the right so the maximum is counted. A constant
/// column yields a single bin of width 1 centred on the value.
pub fn histogram_bins(table: &ResultTable, value_col: usize, bin_count: usize) -> Result<Bins> {
    let rows = render_population(table, &[value_col])?;
    let values = rows
        .iter()
        .map(|&r| number(table, r, value_col))
        .collect::<Result<Vec<f64>>>()?;

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return Ok(Bins {
            edges: vec![min - 0.5, min + 0.5],
            counts: vec![values.len()],
            density: Vec::new(),
            population: rows.len(),
        });
    }

    let bin_count = bin_count.max(1);
    let n = bin_count as f64;
    // Divide before subtracting so a range near f64::MAX stays finite
    let width = max / n - min / n;
    let edges: Vec<f64> = (0..=bin_count)
        .map(|i| {
            let t = i as f64 / n;
            min * (1.0 - t) + max * t
        })
        .collect();
    let mut counts = vec![0usize; bin_count];
    for &v in &values {
        let idx = ((v / width - min / width).floor() as usize).min(bin_count - 1);
        counts[idx] += 1;
    }
    let density = kde_curve(&values, min, max, bin_count, width);

    Ok(Bins {
        edges,
        counts,
        density,
        population: rows.len(),
    })
}

const KDE_POINTS: usize = 200;

/// Gaussian kernel density over [min, max], scaled to histogram counts.
///
/// Bandwidth follows Scott's rule. Empty when the spread is zero or the
/// estimate is not representable.
pub fn kde_curve(values: &[f64], min: f64, max: f64, bin_count: usize, bin_width: f64) -> Vec<(f64, f64)> {
    let n = values.len();
    if n < 2 || !(max > min) {
        return Vec::new();
    }
    let count = n as f64;
    let mean = values.iter().map(|v| v / count).sum::<f64>();
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1.0);
    let bandwidth = variance.sqrt() * count.powf(-0.2);
    if !bandwidth.is_finite() || bandwidth <= 0.0 || !bin_width.is_finite() {
        return Vec::new();
    }

    let norm = 1.0 / (bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    // density * n * bin width puts the curve on the count axis
    let to_counts = count * bin_width;
    let steps = KDE_POINTS.max(bin_count);
    let curve: Vec<(f64, f64)> = (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let x = min * (1.0 - t) + max * t;
            let density: f64 = values
                .iter()
                .map(|v| {
                    let z = (x - v) / bandwidth;
                    norm * (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                / count;
            (x, density * to_counts)
        })
        .collect();

    if curve.iter().all(|(x, y)| x.is_finite() && y.is_finite()) {
        curve
    } else {
        Vec::new()
    }
}

/// Linear-interpolation percentile over already-sorted data
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

fn box_stats(label: String, mut ys: Vec<f64>) -> BoxStats {
    ys.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // Whiskers reach the most extreme data inside the fences
    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);

    let outliers: Vec<f64> = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    BoxStats {
        label,
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    }
}

/// Per-group Tukey statistics, groups in first-seen order.
pub fn box_series(table: &ResultTable, cols: CategoryValue) -> Result<BoxSeries> {
    let rows = render_population(table, &[cols.category, cols.value])?;
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for &r in &rows {
        let key = table.value(r, cols.category).label();
        let v = number(table, r, cols.value)?;
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(v);
    }

    let boxes = order
        .into_iter()
        .map(|label| {
            let ys = groups.remove(&label).unwrap_or_default();
            box_stats(label, ys)
        })
        .collect();

    Ok(BoxSeries {
        boxes,
        population: rows.len(),
    })
}

/// Pivot rows into a (y category × x category) grid.
///
/// Cells missing from the data take the aggregation's identity: 0 for sum
/// and count, undefined for mean.
pub fn heat_grid(table: &ResultTable, cols: Grid, aggregation: Aggregation) -> Result<HeatGrid> {
    let rows = render_population(table, &[cols.x, cols.y, cols.value])?;
    let mut x_labels: Vec<String> = Vec::new();
    let mut y_labels: Vec<String> = Vec::new();
    let mut cells: HashMap<(usize, usize), Accumulator> = HashMap::new();

    for &r in &rows {
        let x = table.value(r, cols.x).label();
        let y = table.value(r, cols.y).label();
        let v = number(table, r, cols.value)?;
        let xi = position_or_push(&mut x_labels, x);
        let yi = position_or_push(&mut y_labels, y);
        cells.entry((yi, xi)).or_default().push(v);
    }

    let grid = (0..y_labels.len())
        .map(|yi| {
            (0..x_labels.len())
                .map(|xi| match cells.get(&(yi, xi)) {
                    Some(acc) => Some(acc.finish(aggregation)),
                    None => match aggregation {
                        Aggregation::Sum | Aggregation::Count => Some(0.0),
                        Aggregation::Mean => None,
                    },
                })
                .collect()
        })
        .collect();

    Ok(HeatGrid {
        x_labels,
        y_labels,
        cells: grid,
        population: rows.len(),
    })
}

fn position_or_push(labels: &mut Vec<String>, label: String) -> usize {
    match labels.iter().position(|l| *l == label) {
        Some(i) => i,
        None => {
            labels.push(label);
            labels.len() - 1
        }
    }
}
