use tracing::info;

use super::{PipelineStep, StepResult};
use crate::constants::STAGE_ENTITY_RESOLUTION;
use crate::domain::Dataset;
use crate::error::Result;
use crate::observability::metrics::{emit_counter, emit_gauge, MetricName};
use crate::pipeline::processing::entity_resolution::{
    EntityResolver, MissingEmailPolicy, SequenceRatio, SimilarityOracle,
};

/// Pipeline step for merging near-duplicate companies and consolidating their records
pub struct EntityResolutionStep<S = SequenceRatio> {
    resolver: EntityResolver<S>,
}

impl EntityResolutionStep<SequenceRatio> {
    pub fn new(threshold: f64, max_candidates: usize, missing_email: MissingEmailPolicy) -> Self {
        Self {
            resolver: EntityResolver::with_settings(threshold, max_candidates, missing_email),
        }
    }
}

impl Default for EntityResolutionStep<SequenceRatio> {
    fn default() -> Self {
        Self {
            resolver: EntityResolver::new(),
        }
    }
}

impl<S: SimilarityOracle + Send + Sync> PipelineStep for EntityResolutionStep<S> {
    fn apply(&self, dataset: Dataset) -> Result<StepResult> {
        info!(
            "🔗 Running entity resolution step on {} rows (threshold: {})",
            dataset.len(),
            self.resolver.clusterer().threshold()
        );
        let outcome = self.resolver.resolve(dataset)?;

        let stats = &outcome.stats;
        emit_gauge(MetricName::EntityResolutionDistinctNames, stats.distinct_names as f64);
        emit_gauge(MetricName::EntityResolutionClusters, stats.clusters as f64);
        emit_counter(MetricName::EntityResolutionNamesMerged, stats.merged_names as u64);
        emit_counter(
            MetricName::EntityResolutionRecordsConsolidated,
            (stats.records_in - stats.records_out) as u64,
        );
        emit_counter(
            MetricName::EntityResolutionUnparsableDates,
            stats.unparsable_dates.len() as u64,
        );

        let stats = serde_json::to_value(&outcome.stats)?;
        Ok(StepResult::new(outcome.dataset).with_metadata("entity_resolution", stats))
    }

    fn step_name(&self) -> &'static str {
        "entity_resolution"
    }

    fn stage_label(&self) -> &'static str {
        STAGE_ENTITY_RESOLUTION
    }
}
