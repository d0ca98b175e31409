use tracing::info;

use super::{PipelineStep, StepResult};
use crate::constants::STAGE_CLEANING;
use crate::domain::Dataset;
use crate::error::Result;
use crate::observability::metrics::{emit_counter, MetricName};
use crate::pipeline::processing::cleaning;

/// Pipeline step for dropping exact duplicates, filling defaults and normalizing text
#[derive(Debug, Default)]
pub struct CleaningStep;

impl CleaningStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for CleaningStep {
    fn apply(&self, mut dataset: Dataset) -> Result<StepResult> {
        info!("🧹 Running cleaning step on {} rows", dataset.len());
        let removed = cleaning::clean(&mut dataset);
        emit_counter(MetricName::CleaningExactDuplicatesRemoved, removed as u64);
        Ok(StepResult::new(dataset).with_metadata("exact_duplicates_removed", removed))
    }

    fn step_name(&self) -> &'static str {
        "cleaning"
    }

    fn stage_label(&self) -> &'static str {
        STAGE_CLEANING
    }
}
