use crate::data::Dataset;
use crate::error::{EngineError, Result};
use crate::ir::{ChartKind, ChartRequest, ResolvedChart};

/// Check a request's kind and bindings against the dataset.
///
/// The kind is checked first, then required roles, then that every bound
/// column exists. Nothing is computed until all of these pass.
pub fn resolve_chart(
    request: &ChartRequest,
    data: &Dataset,
    default_barmode: &str,
) -> Result<ResolvedChart> {
    let kind: ChartKind = request.chart.parse()?;

    let x = binding(&request.x);
    let y = binding(&request.y);
    let color = binding(&request.color);

    let resolved = match kind {
        ChartKind::Bar => {
            let (x, y) = require_xy(kind, x, y)?;
            ResolvedChart::Bar {
                x: data.column_index(x)?,
                y: data.column_index(y)?,
                barmode: binding(&request.barmode)
                    .unwrap_or(default_barmode)
                    .to_string(),
            }
        }
        ChartKind::Line => {
            let (x, y) = require_xy(kind, x, y)?;
            ResolvedChart::Line {
                x: data.column_index(x)?,
                y: data.column_index(y)?,
            }
        }
        ChartKind::Scatter => {
            let (x, y) = require_xy(kind, x, y)?;
            ResolvedChart::Scatter {
                x: data.column_index(x)?,
                y: data.column_index(y)?,
                color: optional_index(data, color)?,
            }
        }
        ChartKind::Histogram => {
            let x = x.ok_or_else(|| EngineError::validation("x is required for histogram."))?;
            ResolvedChart::Histogram {
                x: data.column_index(x)?,
                color: optional_index(data, color)?,
            }
        }
        ChartKind::Pie => {
            let values = binding(&request.values).or(y);
            let names = binding(&request.names).or(x);
            match (values, names) {
                (Some(values), Some(names)) => ResolvedChart::Pie {
                    values: data.column_index(values)?,
                    names: data.column_index(names)?,
                },
                _ => {
                    return Err(EngineError::validation(
                        "values and names are required for pie chart.",
                    ))
                }
            }
        }
        ChartKind::Box => {
            let (x, y) = require_xy(kind, x, y)?;
            ResolvedChart::Box {
                x: data.column_index(x)?,
                y: data.column_index(y)?,
                color: optional_index(data, color)?,
            }
        }
    };

    Ok(resolved)
}

/// An empty binding counts as no binding.
fn binding(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn require_xy<'a>(
    kind: ChartKind,
    x: Option<&'a str>,
    y: Option<&'a str>,
) -> Result<(&'a str, &'a str)> {
    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => {
            let noun = match kind {
                ChartKind::Scatter | ChartKind::Box => format!("{} plot", kind),
                _ => format!("{} chart", kind),
            };
            Err(EngineError::validation(format!(
                "x and y are required for {}.",
                noun
            )))
        }
    }
}

fn optional_index(data: &Dataset, name: Option<&str>) -> Result<Option<usize>> {
    name.map(|n| data.column_index(n)).transpose()
}
