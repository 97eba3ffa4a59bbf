use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::coerce::{coerce_value, format_timestamp, value_as_datetime, value_as_number};
use crate::data::{Column, Dataset, Value};
use crate::error::Result;
use crate::ir::{
    AxisKind, BarData, BoxData, ChartRequest, ChartResult, LineAxis, LineData, PieData,
    ResolvedChart, Series, Split, ValuesData, XyData,
};
use crate::resolve::resolve_chart;
use crate::stats::mean_of;
use crate::EngineOptions;

/// Main entry point: validate a chart request and shape the dataset for it.
pub fn chart_data(data: &Dataset, request: &ChartRequest, options: &EngineOptions) -> Result<ChartResult> {
    let resolved = resolve_chart(request, data, &options.default_barmode)?;
    let result = apply_chart(&resolved, data, options.axis_threshold);
    debug!(chart = %result.kind(), rows = data.row_count(), "shaped chart data");
    Ok(result)
}

/// Shape already-resolved bindings. Column indices must come from `data`.
pub fn apply_chart(chart: &ResolvedChart, data: &Dataset, axis_threshold: f64) -> ChartResult {
    match chart {
        ResolvedChart::Bar { x, y, barmode } => {
            ChartResult::Bar(bar_data(data.column_at(*x), data.column_at(*y), barmode))
        }
        ResolvedChart::Line { x, y } => ChartResult::Line(line_data(
            data.column_at(*x),
            data.column_at(*y),
            axis_threshold,
        )),
        ResolvedChart::Scatter { x, y, color } => ChartResult::Scatter(scatter_data(
            data.column_at(*x),
            data.column_at(*y),
            color.map(|c| data.column_at(c)),
        )),
        ResolvedChart::Histogram { x, color } => ChartResult::Histogram(histogram_data(
            data.column_at(*x),
            color.map(|c| data.column_at(c)),
        )),
        ResolvedChart::Pie { values, names } => {
            ChartResult::Pie(pie_data(data.column_at(*values), data.column_at(*names)))
        }
        ResolvedChart::Box { x, y, color } => ChartResult::Box(box_data(
            data.column_at(*x),
            data.column_at(*y),
            color.map(|c| data.column_at(c)),
        )),
    }
}

// =============================================================================
// Grouping
// =============================================================================

/// Grouping key built from a raw cell. Numbers sort numerically and before
/// text; text sorts lexicographically.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Number(f64),
    Text(String),
}

impl GroupKey {
    /// Missing cells have no key and drop out of grouped output.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Missing => None,
            Value::Number(n) if n.is_nan() => None,
            // -0 and 0 share a group.
            Value::Number(n) if *n == 0.0 => Some(GroupKey::Number(0.0)),
            Value::Number(n) => Some(GroupKey::Number(*n)),
            Value::Text(s) => Some(GroupKey::Text(s.clone())),
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Number(_), GroupKey::Text(_)) => Ordering::Less,
            (GroupKey::Text(_), GroupKey::Number(_)) => Ordering::Greater,
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(n) => write!(f, "{}", n),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

/// Partition `rows` by `key` and fold each partition into an accumulator.
///
/// Rows whose key is `None` are skipped. Groups come back sorted by key.
pub fn group_reduce<R, K, A>(
    rows: impl IntoIterator<Item = R>,
    key: impl Fn(&R) -> Option<K>,
    init: impl Fn() -> A,
    fold: impl Fn(&mut A, R),
) -> Vec<(K, A)>
where
    K: Ord,
{
    let mut groups: BTreeMap<K, A> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(&row) {
            let acc = groups.entry(k).or_insert_with(&init);
            fold(acc, row);
        }
    }
    groups.into_iter().collect()
}

/// `(row, value)` for every row whose cell coerces.
fn valid_rows(column: &Column) -> Vec<(usize, f64)> {
    column
        .values
        .iter()
        .enumerate()
        .filter_map(|(row, v)| coerce_value(v).map(|n| (row, n)))
        .collect()
}

fn missing_last<T: PartialOrd>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// =============================================================================
// Per-kind shaping
// =============================================================================

fn bar_data(x_col: &Column, y_col: &Column, barmode: &str) -> BarData {
    let rows = valid_rows(y_col);
    let mean = mean_of(&rows.iter().map(|(_, v)| *v).collect::<Vec<_>>());

    let groups = group_reduce(
        rows,
        |(row, _)| Some(x_col.values[*row].to_string()),
        || 0.0,
        |sum, (_, v)| *sum += v,
    );
    let (x, y) = groups.into_iter().unzip();

    BarData {
        x,
        y,
        mean,
        barmode: barmode.to_string(),
    }
}

fn line_data(x_col: &Column, y_col: &Column, threshold: f64) -> LineData {
    let rows = valid_rows(y_col);
    let mean = mean_of(&rows.iter().map(|(_, v)| *v).collect::<Vec<_>>());
    let needed = rows.len() as f64 * threshold;

    let dates: Vec<_> = rows
        .iter()
        .map(|(row, _)| value_as_datetime(&x_col.values[*row]))
        .collect();
    let parsed = dates.iter().flatten().count();
    if parsed > 0 && parsed as f64 >= needed {
        let mut points: Vec<_> = dates.into_iter().zip(rows.iter().map(|(_, v)| *v)).collect();
        points.sort_by(|a, b| missing_last(&a.0, &b.0));
        let (x, y): (Vec<_>, Vec<_>) = points
            .into_iter()
            .map(|(dt, v)| (dt.map(|d| format_timestamp(&d)), v))
            .unzip();
        return LineData {
            x: LineAxis::Temporal(x),
            y,
            mean,
            x_type: AxisKind::Temporal,
        };
    }

    let numbers: Vec<_> = rows
        .iter()
        .map(|(row, _)| value_as_number(&x_col.values[*row]))
        .collect();
    let parsed = numbers.iter().flatten().count();
    if parsed > 0 && parsed as f64 >= needed {
        let mut points: Vec<_> = numbers.into_iter().zip(rows.iter().map(|(_, v)| *v)).collect();
        points.sort_by(|a, b| missing_last(&a.0, &b.0));
        let (x, y) = points.into_iter().unzip();
        return LineData {
            x: LineAxis::Numeric(x),
            y,
            mean,
            x_type: AxisKind::Numeric,
        };
    }

    let (x, y) = rows
        .into_iter()
        .map(|(row, v)| (x_col.values[row].to_string(), v))
        .unzip();
    LineData {
        x: LineAxis::Category(x),
        y,
        mean,
        x_type: AxisKind::Category,
    }
}

fn scatter_data(x_col: &Column, y_col: &Column, color: Option<&Column>) -> Split<XyData> {
    let points: Vec<(usize, f64, f64)> = x_col
        .values
        .iter()
        .zip(&y_col.values)
        .enumerate()
        .filter_map(|(row, (x, y))| {
            let x = coerce_value(x)?;
            let y = coerce_value(y)?;
            Some((row, x, y))
        })
        .collect();

    match color {
        Some(color_col) => {
            let groups = group_reduce(
                points,
                |(row, _, _)| GroupKey::from_value(&color_col.values[*row]),
                || XyData { x: Vec::new(), y: Vec::new() },
                |acc, (_, x, y)| {
                    acc.x.push(x);
                    acc.y.push(y);
                },
            );
            Split::Grouped {
                series: named(groups),
            }
        }
        None => {
            let (x, y) = points.into_iter().map(|(_, x, y)| (x, y)).unzip();
            Split::Single(XyData { x, y })
        }
    }
}

fn histogram_data(x_col: &Column, color: Option<&Column>) -> Split<ValuesData> {
    match color {
        Some(color_col) => {
            // Every color group is kept, even one whose values are all missing.
            let groups = group_reduce(
                x_col.values.iter().enumerate(),
                |(row, _)| GroupKey::from_value(&color_col.values[*row]),
                || ValuesData { x: Vec::new() },
                |acc, (_, v)| acc.x.extend(coerce_value(v)),
            );
            Split::Grouped {
                series: named(groups),
            }
        }
        None => Split::Single(ValuesData {
            x: valid_rows(x_col).into_iter().map(|(_, v)| v).collect(),
        }),
    }
}

fn pie_data(values_col: &Column, names_col: &Column) -> PieData {
    let groups = group_reduce(
        valid_rows(values_col),
        |(row, _)| GroupKey::from_value(&names_col.values[*row]),
        || 0.0,
        |sum, (_, v)| *sum += v,
    );
    let (names, values) = groups
        .into_iter()
        .map(|(key, sum)| (key.to_string(), sum))
        .unzip();
    PieData { values, names }
}

fn box_data(x_col: &Column, y_col: &Column, color: Option<&Column>) -> Split<BoxData> {
    let rows = valid_rows(y_col);

    match color {
        Some(color_col) => {
            let groups = group_reduce(
                rows,
                |(row, _)| {
                    let x = GroupKey::from_value(&x_col.values[*row])?;
                    let c = GroupKey::from_value(&color_col.values[*row])?;
                    Some((x, c))
                },
                Vec::new,
                |acc, (_, v)| acc.push(v),
            );
            let series = groups
                .into_iter()
                .map(|((x, c), ys)| Series {
                    name: format!("{} - {}", x, c),
                    data: BoxData {
                        x: vec![x.to_string(); ys.len()],
                        y: ys,
                    },
                })
                .collect();
            Split::Grouped { series }
        }
        None => {
            let (x, y) = rows
                .into_iter()
                .map(|(row, v)| (x_col.values[row].to_string(), v))
                .unzip();
            Split::Single(BoxData { x, y })
        }
    }
}

fn named<T>(groups: Vec<(GroupKey, T)>) -> Vec<Series<T>> {
    groups
        .into_iter()
        .map(|(key, data)| Series {
            name: key.to_string(),
            data,
        })
        .collect()
}
