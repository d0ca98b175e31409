use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format for '{0}'. Use CSV or JSON.")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A raw company name reached the rewrite without a canonical entry.
    #[error("No canonical mapping for company name '{name}'")]
    MappingIncomplete { name: String },

    /// Upstream guarantees about `company_name` did not hold.
    #[error("Schema assumption violated: {0}")]
    SchemaAssumption(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
