pub mod file_output_adapter;

pub use file_output_adapter::{write_dataset_csv, FilePipelineOutputAdapter};
