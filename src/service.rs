//! The request/response boundary a web layer calls into.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{Dataset, Preview, StatsTable};
use crate::error::{EngineError, Result};
use crate::ir::{ChartRequest, ChartResult};
use crate::store::DatasetStore;
use crate::transform::chart_data;
use crate::EngineOptions;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub token: String,
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
}

/// Chart-data payload: the token plus the chart bindings.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ChartDataRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub chart: ChartRequest,
}

/// Holds uploaded datasets and answers queries against them.
pub struct Service {
    store: DatasetStore,
    options: EngineOptions,
}

impl Service {
    pub fn new(options: EngineOptions) -> Self {
        let store = DatasetStore::new(
            options.store_capacity,
            Duration::from_secs(options.session_ttl_secs),
        );
        Self { store, options }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Parse an uploaded CSV and keep it under a new token.
    pub fn upload(&self, bytes: &[u8]) -> Result<UploadResponse> {
        let dataset = Dataset::from_bytes(bytes)?;
        let columns = dataset.columns();
        let numeric_columns = dataset.numeric_columns();
        let token = self.store.insert(dataset);
        info!(%token, columns = columns.len(), "accepted upload");
        Ok(UploadResponse {
            token,
            columns,
            numeric_columns,
        })
    }

    pub fn columns(&self, token: Option<&str>) -> Result<ColumnsResponse> {
        let dataset = self.dataset(token)?;
        Ok(ColumnsResponse {
            columns: dataset.columns(),
            numeric_columns: dataset.numeric_columns(),
        })
    }

    pub fn preview(&self, token: Option<&str>) -> Result<Preview> {
        Ok(self.dataset(token)?.preview(self.options.preview_limit))
    }

    pub fn describe(&self, token: Option<&str>) -> Result<StatsTable> {
        Ok(self.dataset(token)?.describe())
    }

    pub fn chart_data(&self, request: &ChartDataRequest) -> Result<ChartResult> {
        let dataset = self.dataset(request.token.as_deref())?;
        chart_data(&dataset, &request.chart, &self.options)
    }

    fn dataset(&self, token: Option<&str>) -> Result<std::sync::Arc<Dataset>> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => self.store.get(token),
            None => Err(EngineError::TokenNotFound),
        }
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
