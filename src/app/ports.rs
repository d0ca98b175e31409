use std::path::PathBuf;

use crate::domain::Dataset;
use crate::observability::PipelineMetrics;
use crate::pipeline::report::KpiRow;

/// Where a finished pipeline run writes its artifacts
pub trait PipelineOutputPort: Send + Sync {
    /// Write the analytics-ready dataset
    fn write_processed(&self, dataset: &Dataset) -> anyhow::Result<PathBuf>;

    fn write_kpi_summary(&self, rows: &[KpiRow]) -> anyhow::Result<PathBuf>;

    fn write_metrics(&self, metrics: &PipelineMetrics) -> anyhow::Result<PathBuf>;
}
