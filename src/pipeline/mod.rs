// Data processing pipeline: ingestion, processing steps and reporting

pub mod ingestion;
pub mod processing;
pub mod report;
pub mod steps;

// Re-export key types for convenience
pub use report::{summarize_kpis, KpiRow};
pub use steps::{PipelineStep, StepResult};
