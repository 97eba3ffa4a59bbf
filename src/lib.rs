// Library exports for csvchart

pub mod coerce;
pub mod data;
pub mod error;
pub mod parser;
pub mod stats;

// Chart pipeline
pub mod ir;
pub mod resolve;
pub mod transform;

// Request boundary
pub mod service;
pub mod store;

use std::path::Path;

use serde::Deserialize;

pub use data::{CoercedSeries, Dataset, Preview, StatsTable, Value};
pub use error::{EngineError, ErrorBody, Result};
pub use ir::{ChartKind, ChartRequest, ChartResult};
pub use service::Service;
pub use store::DatasetStore;
pub use transform::chart_data;

/// Tunables for the engine and its request boundary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineOptions {
    /// Most rows a preview returns.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
    /// Share of line-chart x values that must parse as dates (or numbers)
    /// for the axis to be treated as temporal (or numeric).
    #[serde(default = "default_axis_threshold")]
    pub axis_threshold: f64,
    #[serde(default = "default_store_capacity")]
    pub store_capacity: usize,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_barmode")]
    pub default_barmode: String,
}

fn default_preview_limit() -> usize { 500 }
fn default_axis_threshold() -> f64 { 0.8 }
fn default_store_capacity() -> usize { 64 }
fn default_session_ttl_secs() -> u64 { 24 * 60 * 60 }
fn default_barmode() -> String { "group".to_string() }

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            preview_limit: default_preview_limit(),
            axis_threshold: default_axis_threshold(),
            store_capacity: default_store_capacity(),
            session_ttl_secs: default_session_ttl_secs(),
            default_barmode: default_barmode(),
        }
    }
}

impl EngineOptions {
    /// Load options from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text)
            .map_err(|e| EngineError::validation(format!("invalid options: {}", e)))?;
        if !(0.0..=1.0).contains(&options.axis_threshold) {
            return Err(EngineError::validation(format!(
                "axis_threshold must be between 0 and 1, got {}",
                options.axis_threshold
            )));
        }
        Ok(options)
    }
}
