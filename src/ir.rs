use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// =============================================================================
// Requests
// =============================================================================

/// The fixed set of chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Histogram,
    Pie,
    Box,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Histogram,
        ChartKind::Pie,
        ChartKind::Box,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Histogram => "histogram",
            ChartKind::Pie => "pie",
            ChartKind::Box => "box",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or(EngineError::UnsupportedChart { chart: lowered })
    }
}

/// Column role bindings for one chart. Only `chart` is always needed; which
/// roles are required depends on the kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartRequest {
    #[serde(default)]
    pub chart: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
}

impl ChartRequest {
    pub fn new(chart: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            ..Default::default()
        }
    }

    pub fn x(mut self, col: impl Into<String>) -> Self {
        self.x = Some(col.into());
        self
    }

    pub fn y(mut self, col: impl Into<String>) -> Self {
        self.y = Some(col.into());
        self
    }

    pub fn color(mut self, col: impl Into<String>) -> Self {
        self.color = Some(col.into());
        self
    }

    pub fn values(mut self, col: impl Into<String>) -> Self {
        self.values = Some(col.into());
        self
    }

    pub fn names(mut self, col: impl Into<String>) -> Self {
        self.names = Some(col.into());
        self
    }

    pub fn barmode(mut self, mode: impl Into<String>) -> Self {
        self.barmode = Some(mode.into());
        self
    }
}

/// A request that has been checked against a dataset: column names have been
/// turned into column indices.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedChart {
    Bar { x: usize, y: usize, barmode: String },
    Line { x: usize, y: usize },
    Scatter { x: usize, y: usize, color: Option<usize> },
    Histogram { x: usize, color: Option<usize> },
    Pie { values: usize, names: usize },
    Box { x: usize, y: usize, color: Option<usize> },
}

// =============================================================================
// Results
// =============================================================================

/// Chart-ready data, tagged with the chart kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chart", rename_all = "lowercase")]
pub enum ChartResult {
    Bar(BarData),
    Line(LineData),
    Scatter(Split<XyData>),
    Histogram(Split<ValuesData>),
    Pie(PieData),
    Box(Split<BoxData>),
}

impl ChartResult {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartResult::Bar(_) => ChartKind::Bar,
            ChartResult::Line(_) => ChartKind::Line,
            ChartResult::Scatter(_) => ChartKind::Scatter,
            ChartResult::Histogram(_) => ChartKind::Histogram,
            ChartResult::Pie(_) => ChartKind::Pie,
            ChartResult::Box(_) => ChartKind::Box,
        }
    }
}

/// Either one flat payload or one named payload per color group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Split<T> {
    Single(T),
    Grouped { series: Vec<Series<T>> },
}

impl<T> Split<T> {
    pub fn series(&self) -> Option<&[Series<T>]> {
        match self {
            Split::Grouped { series } => Some(series),
            Split::Single(_) => None,
        }
    }

    pub fn single(&self) -> Option<&T> {
        match self {
            Split::Single(data) => Some(data),
            Split::Grouped { .. } => None,
        }
    }
}

/// One group's contribution to a multi-group chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series<T> {
    pub name: String,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarData {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub mean: Option<f64>,
    pub barmode: String,
}

/// How the line chart's x axis was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Temporal,
    Numeric,
    Category,
}

/// Line x values; the variant always matches [`LineData::x_type`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LineAxis {
    Temporal(Vec<Option<String>>),
    Numeric(Vec<Option<f64>>),
    Category(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineData {
    pub x: LineAxis,
    pub y: Vec<f64>,
    pub mean: Option<f64>,
    #[serde(rename = "xType")]
    pub x_type: AxisKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XyData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuesData {
    pub x: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieData {
    pub values: Vec<f64>,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxData {
    pub x: Vec<String>,
    pub y: Vec<f64>,
}
