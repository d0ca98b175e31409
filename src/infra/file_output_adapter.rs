use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::app::ports::PipelineOutputPort;
use crate::constants::{KPI_SUMMARY_FILE_NAME, METRICS_FILE_NAME, PROCESSED_FILE_NAME};
use crate::domain::Dataset;
use crate::observability::PipelineMetrics;
use crate::pipeline::report::KpiRow;

/// File-based adapter writing the run artifacts into a processed and a reports directory
pub struct FilePipelineOutputAdapter {
    pub processed_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl FilePipelineOutputAdapter {
    pub fn new(processed_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }

    /// Ensure the output directory exists
    fn ensure_directory(dir: &Path) -> anyhow::Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            debug!("Created output directory: {}", dir.display());
        }
        Ok(())
    }
}

/// Write a dataset as CSV in column order; missing values are empty cells
pub fn write_dataset_csv<W: Write>(dataset: &Dataset, writer: W) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(dataset.columns())?;
    for record in dataset.records() {
        csv_writer.write_record(dataset.columns().iter().map(|c| record.get(c).render()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

impl PipelineOutputPort for FilePipelineOutputAdapter {
    fn write_processed(&self, dataset: &Dataset) -> anyhow::Result<PathBuf> {
        Self::ensure_directory(&self.processed_dir)?;
        let path = self.processed_dir.join(PROCESSED_FILE_NAME);
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_dataset_csv(dataset, file)?;
        info!("Processed data saved to {}", path.display());
        Ok(path)
    }

    fn write_kpi_summary(&self, rows: &[KpiRow]) -> anyhow::Result<PathBuf> {
        Self::ensure_directory(&self.reports_dir)?;
        let path = self.reports_dir.join(KPI_SUMMARY_FILE_NAME);
        let mut csv_writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        csv_writer.write_record(KpiRow::HEADERS)?;
        for row in rows {
            csv_writer.write_record(row.to_csv_row())?;
        }
        csv_writer.flush()?;
        info!("KPI summary saved to {}", path.display());
        Ok(path)
    }

    fn write_metrics(&self, metrics: &PipelineMetrics) -> anyhow::Result<PathBuf> {
        Self::ensure_directory(&self.reports_dir)?;
        let path = self.reports_dir.join(METRICS_FILE_NAME);
        metrics.save(&path)?;
        Ok(path)
    }
}
