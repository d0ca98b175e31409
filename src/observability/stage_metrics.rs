//! Per-stage shape metrics for one pipeline run, saved as `pipeline_metrics.json`.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::metrics::{emit_gauge_with_stage, MetricName};
use crate::constants::REVENUE;
use crate::domain::Dataset;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMetrics {
    pub stage: String,
    pub row_count: usize,
    pub column_count: usize,
    pub missing_values_total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pipeline_value: Option<f64>,
    /// Extra step details, e.g. entity resolution statistics
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineMetrics {
    pub run_id: Uuid,
    pub timestamp: String,
    pub stages: Vec<StageMetrics>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now().to_rfc3339(),
            stages: Vec::new(),
        }
    }

    /// Record the shape of the dataset after a stage
    pub fn log_stage(&mut self, stage: &str, dataset: &Dataset) -> &StageMetrics {
        self.log_stage_with_details(stage, dataset, Map::new())
    }

    pub fn log_stage_with_details(
        &mut self,
        stage: &str,
        dataset: &Dataset,
        details: Map<String, JsonValue>,
    ) -> &StageMetrics {
        let entry = StageMetrics {
            stage: stage.to_string(),
            row_count: dataset.len(),
            column_count: dataset.columns().len(),
            missing_values_total: dataset.missing_values_total(),
            total_pipeline_value: dataset
                .has_column(REVENUE)
                .then(|| dataset.sum_numeric(REVENUE)),
            details,
        };

        info!("--- [METRICS] {}: {} rows ---", stage, entry.row_count);
        emit_gauge_with_stage(MetricName::StageRows, stage, entry.row_count as f64);

        self.stages.push(entry);
        &self.stages[self.stages.len() - 1]
    }

    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }

    /// Write the metrics as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body)?;
        info!("Metrics saved to {}", path.display());
        Ok(())
    }
}
