pub mod pipeline_use_case;
pub mod ports;

pub use pipeline_use_case::{ExportedFiles, PipelineRun, PipelineUseCase};
pub use ports::PipelineOutputPort;
