use tracing::info;

use super::{PipelineStep, StepResult};
use crate::constants::STAGE_SCORING;
use crate::domain::Dataset;
use crate::error::Result;
use crate::pipeline::processing::scoring;

/// Pipeline step for customer segmentation and lead scoring
#[derive(Debug, Default)]
pub struct ScoringStep;

impl ScoringStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for ScoringStep {
    fn apply(&self, mut dataset: Dataset) -> Result<StepResult> {
        info!("💰 Running scoring step on {} rows", dataset.len());
        scoring::score(&mut dataset);
        Ok(StepResult::new(dataset))
    }

    fn step_name(&self) -> &'static str {
        "scoring"
    }

    fn stage_label(&self) -> &'static str {
        STAGE_SCORING
    }
}
