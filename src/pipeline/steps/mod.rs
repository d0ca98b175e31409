use serde_json::{Map, Value as JsonValue};

use crate::domain::Dataset;
use crate::error::Result;

/// Common trait for all dataset-transforming pipeline steps
pub trait PipelineStep: Send + Sync {
    /// Transform the dataset
    fn apply(&self, dataset: Dataset) -> Result<StepResult>;

    /// Get the name of this pipeline step
    fn step_name(&self) -> &'static str;

    /// Label the step reports its metrics under
    fn stage_label(&self) -> &'static str;
}

/// Result of executing a pipeline step
#[derive(Debug, Clone)]
pub struct StepResult {
    pub dataset: Dataset,
    pub metadata: Map<String, JsonValue>,
}

impl StepResult {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

pub mod cleaning;
pub mod enrich;
pub mod entity_resolution;
pub mod scoring;

pub use cleaning::CleaningStep;
pub use enrich::EnrichStep;
pub use entity_resolution::EntityResolutionStep;
pub use scoring::ScoringStep;

/// The dataset-transforming steps in run order
pub fn default_steps(resolution: EntityResolutionStep) -> Vec<Box<dyn PipelineStep>> {
    vec![
        Box::new(CleaningStep::new()),
        Box::new(EnrichStep::new()),
        Box::new(resolution),
        Box::new(ScoringStep::new()),
    ]
}
