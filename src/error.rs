use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Probe of pool '{pool}' failed: {reason}")]
    ProbeFailed { pool: String, reason: String },

    #[error("Could not parse zpool report: {0}")]
    ParseFailed(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
