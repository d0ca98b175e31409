use tracing::info;

use super::{PipelineStep, StepResult};
use crate::constants::STAGE_ENRICHMENT;
use crate::domain::Dataset;
use crate::error::Result;
use crate::pipeline::processing::enrich;

/// Pipeline step for state abbreviations, regions and keyword industries
#[derive(Debug, Default)]
pub struct EnrichStep;

impl EnrichStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for EnrichStep {
    fn apply(&self, mut dataset: Dataset) -> Result<StepResult> {
        info!("🌐 Running enrich step on {} rows", dataset.len());
        let industries_filled = enrich::enrich(&mut dataset);
        Ok(StepResult::new(dataset).with_metadata("industries_inferred", industries_filled))
    }

    fn step_name(&self) -> &'static str {
        "enrich"
    }

    fn stage_label(&self) -> &'static str {
        STAGE_ENRICHMENT
    }
}
