//! Entity resolution: collapse near-duplicate company names onto one canonical
//! spelling, then consolidate the records that now describe the same company.

pub mod clustering;
pub mod consolidate;
pub mod rewrite;
pub mod similarity;

use serde::Serialize;
use tracing::info;

use crate::domain::Dataset;
use crate::error::Result;

pub use clustering::{
    CanonicalClusterer, CanonicalMap, NameCluster, DEFAULT_MAX_CANDIDATES, DEFAULT_SIMILARITY_THRESHOLD,
};
pub use consolidate::{
    parse_close_date, ConsolidationSummary, DateParseWarning, DuplicateConsolidator, MissingEmailPolicy,
};
pub use rewrite::{company_names, rewrite_company_names};
pub use similarity::{sequence_ratio, SequenceRatio, SimilarityOracle};

/// Counters describing one resolution run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionStats {
    pub distinct_names: usize,
    pub clusters: usize,
    pub merged_names: usize,
    pub records_in: usize,
    pub records_out: usize,
    pub unparsable_dates: Vec<DateParseWarning>,
}

#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    pub dataset: Dataset,
    pub stats: ResolutionStats,
}

/// Cluster, rewrite and consolidate in one pass
#[derive(Debug, Clone)]
pub struct EntityResolver<S = SequenceRatio> {
    clusterer: CanonicalClusterer<S>,
    consolidator: DuplicateConsolidator,
}

impl Default for EntityResolver<SequenceRatio> {
    fn default() -> Self {
        Self {
            clusterer: CanonicalClusterer::new(),
            consolidator: DuplicateConsolidator::new(),
        }
    }
}

impl EntityResolver<SequenceRatio> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with the default oracle and the given settings
    pub fn with_settings(threshold: f64, max_candidates: usize, missing_email: MissingEmailPolicy) -> Self {
        Self {
            clusterer: CanonicalClusterer::new()
                .with_threshold(threshold)
                .with_max_candidates(max_candidates),
            consolidator: DuplicateConsolidator::new().with_missing_email_policy(missing_email),
        }
    }
}

impl<S: SimilarityOracle> EntityResolver<S> {
    pub fn from_parts(clusterer: CanonicalClusterer<S>, consolidator: DuplicateConsolidator) -> Self {
        Self {
            clusterer,
            consolidator,
        }
    }

    pub fn clusterer(&self) -> &CanonicalClusterer<S> {
        &self.clusterer
    }

    pub fn consolidator(&self) -> &DuplicateConsolidator {
        &self.consolidator
    }

    pub fn resolve(&self, mut dataset: Dataset) -> Result<ResolutionOutcome> {
        let names = company_names(&dataset)?;
        let map = self.clusterer.cluster(&names);
        info!(
            "Resolved {} distinct company names into {} clusters",
            map.len(),
            map.cluster_count()
        );

        rewrite_company_names(&mut dataset, &map)?;
        let (dataset, summary) = self.consolidator.consolidate(dataset)?;
        info!(
            "Consolidated {} records into {} ({} duplicates removed)",
            summary.records_in,
            summary.records_out,
            summary.records_removed()
        );

        let stats = ResolutionStats {
            distinct_names: map.len(),
            clusters: map.cluster_count(),
            merged_names: map.merged_count(),
            records_in: summary.records_in,
            records_out: summary.records_out,
            unparsable_dates: summary.date_warnings,
        };

        Ok(ResolutionOutcome { dataset, stats })
    }
}
