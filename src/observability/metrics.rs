//! Prometheus metrics for the CRM pipeline
//!
//! Metric names live in one enum so call sites never spell a metric by hand.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Run metrics
    PipelineRunsSuccess,
    PipelineRunsFailed,
    PipelineRunDuration,

    // Stage metrics
    StageRows,
    StageDuration,

    // Ingestion metrics
    IngestionRecordsLoaded,

    // Cleaning metrics
    CleaningExactDuplicatesRemoved,

    // Entity resolution metrics
    EntityResolutionDistinctNames,
    EntityResolutionClusters,
    EntityResolutionNamesMerged,
    EntityResolutionRecordsConsolidated,
    EntityResolutionUnparsableDates,

    // Upload metrics
    UploadsReceived,
    UploadBytes,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    /// Get the metric name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::PipelineRunsSuccess => "crm_pipeline_runs_success_total",
            MetricName::PipelineRunsFailed => "crm_pipeline_runs_failed_total",
            MetricName::PipelineRunDuration => "crm_pipeline_run_duration_seconds",

            MetricName::StageRows => "crm_stage_rows",
            MetricName::StageDuration => "crm_stage_duration_seconds",

            MetricName::IngestionRecordsLoaded => "crm_ingestion_records_loaded_total",

            MetricName::CleaningExactDuplicatesRemoved => "crm_cleaning_exact_duplicates_removed_total",

            MetricName::EntityResolutionDistinctNames => "crm_entity_resolution_distinct_names",
            MetricName::EntityResolutionClusters => "crm_entity_resolution_clusters",
            MetricName::EntityResolutionNamesMerged => "crm_entity_resolution_names_merged_total",
            MetricName::EntityResolutionRecordsConsolidated => "crm_entity_resolution_records_consolidated_total",
            MetricName::EntityResolutionUnparsableDates => "crm_entity_resolution_unparsable_dates_total",

            MetricName::UploadsReceived => "crm_uploads_received_total",
            MetricName::UploadBytes => "crm_upload_bytes",
        }
    }

    /// Get all metric names as an iterator
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            PipelineRunsSuccess,
            PipelineRunsFailed,
            PipelineRunDuration,
            StageRows,
            StageDuration,
            IngestionRecordsLoaded,
            CleaningExactDuplicatesRemoved,
            EntityResolutionDistinctNames,
            EntityResolutionClusters,
            EntityResolutionNamesMerged,
            EntityResolutionRecordsConsolidated,
            EntityResolutionUnparsableDates,
            UploadsReceived,
            UploadBytes,
        ]
        .into_iter()
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        warn!("Metrics recorder was installed concurrently");
    }
    info!("Metrics system initialized");
    Ok(())
}

/// Render all recorded metrics in the Prometheus text format
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub fn emit_counter(name: MetricName, value: u64) {
    ::metrics::counter!(name.as_str()).increment(value);
}

pub fn emit_gauge(name: MetricName, value: f64) {
    ::metrics::gauge!(name.as_str()).set(value);
}

pub fn emit_gauge_with_stage(name: MetricName, stage: &str, value: f64) {
    ::metrics::gauge!(name.as_str(), "stage" => stage.to_string()).set(value);
}

pub fn emit_histogram(name: MetricName, value: f64) {
    ::metrics::histogram!(name.as_str()).record(value);
}

pub fn emit_histogram_with_stage(name: MetricName, stage: &str, value: f64) {
    ::metrics::histogram!(name.as_str(), "stage" => stage.to_string()).record(value);
}
