// Observability: Prometheus metrics and per-stage run metrics

pub mod metrics;
pub mod stage_metrics;

pub use metrics::{init_metrics, render_metrics, MetricName};
pub use stage_metrics::{PipelineMetrics, StageMetrics};
