use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::app::ports::PipelineOutputPort;
use crate::config::EntityResolutionConfig;
use crate::constants::STAGE_INGESTION;
use crate::domain::Dataset;
use crate::observability::metrics::{
    emit_counter, emit_histogram, emit_histogram_with_stage, MetricName,
};
use crate::observability::PipelineMetrics;
use crate::pipeline::ingestion::{load_data, normalize_schema};
use crate::pipeline::report::{summarize_kpis, KpiRow};
use crate::pipeline::steps::{default_steps, EntityResolutionStep, PipelineStep};

/// Paths of the artifacts written by a run
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub processed: PathBuf,
    pub kpi_summary: PathBuf,
    pub metrics: PathBuf,
}

/// Everything a completed run produced
#[derive(Debug)]
pub struct PipelineRun {
    pub dataset: Dataset,
    pub metrics: PipelineMetrics,
    pub kpi_summary: Vec<KpiRow>,
    pub exported: Option<ExportedFiles>,
}

/// Use case running ingestion and every processing step over one input file
pub struct PipelineUseCase {
    steps: Vec<Box<dyn PipelineStep>>,
    output_port: Option<Arc<dyn PipelineOutputPort>>,
}

impl PipelineUseCase {
    /// Create a use case with custom steps and no output
    pub fn new(steps: Vec<Box<dyn PipelineStep>>) -> Self {
        Self {
            steps,
            output_port: None,
        }
    }

    /// Standard step sequence with entity resolution tuned by `config`
    pub fn from_config(config: &EntityResolutionConfig) -> Self {
        Self::new(default_steps(EntityResolutionStep::new(
            config.similarity_threshold,
            config.max_candidates,
            config.missing_email_policy,
        )))
    }

    /// Export artifacts through `port` once every stage has succeeded
    pub fn with_output(mut self, port: Arc<dyn PipelineOutputPort>) -> Self {
        self.output_port = Some(port);
        self
    }

    pub fn run(&self, input: &Path) -> Result<PipelineRun> {
        let start_time = Instant::now();
        info!("🚀 Starting pipeline run for {}", input.display());

        match self.run_stages(input) {
            Ok(run) => {
                emit_counter(MetricName::PipelineRunsSuccess, 1);
                emit_histogram(MetricName::PipelineRunDuration, start_time.elapsed().as_secs_f64());
                info!(
                    "✅ Pipeline run {} completed with {} rows",
                    run.metrics.run_id,
                    run.dataset.len()
                );
                Ok(run)
            }
            Err(e) => {
                emit_counter(MetricName::PipelineRunsFailed, 1);
                error!("Pipeline run failed: {:#}", e);
                Err(e)
            }
        }
    }

    fn run_stages(&self, input: &Path) -> Result<PipelineRun> {
        let mut metrics = PipelineMetrics::new();

        let stage_start = Instant::now();
        let mut dataset = load_data(input)
            .map(normalize_schema)
            .with_context(|| format!("Pipeline failed at {}", STAGE_INGESTION))?;
        emit_counter(MetricName::IngestionRecordsLoaded, dataset.len() as u64);
        emit_histogram_with_stage(
            MetricName::StageDuration,
            STAGE_INGESTION,
            stage_start.elapsed().as_secs_f64(),
        );
        metrics.log_stage(STAGE_INGESTION, &dataset);

        for step in &self.steps {
            let stage_start = Instant::now();
            debug!("Running step {}", step.step_name());
            let result = step
                .apply(dataset)
                .with_context(|| format!("Pipeline failed at {}", step.stage_label()))?;
            emit_histogram_with_stage(
                MetricName::StageDuration,
                step.stage_label(),
                stage_start.elapsed().as_secs_f64(),
            );

            dataset = result.dataset;
            metrics.log_stage_with_details(step.stage_label(), &dataset, result.metadata);
        }

        let kpi_summary = summarize_kpis(&dataset);

        let exported = match &self.output_port {
            Some(port) => Some(ExportedFiles {
                processed: port
                    .write_processed(&dataset)
                    .context("Failed to export processed data")?,
                kpi_summary: port
                    .write_kpi_summary(&kpi_summary)
                    .context("Failed to export KPI summary")?,
                metrics: port
                    .write_metrics(&metrics)
                    .context("Failed to export pipeline metrics")?,
            }),
            None => None,
        };

        Ok(PipelineRun {
            dataset,
            metrics,
            kpi_summary,
            exported,
        })
    }
}
