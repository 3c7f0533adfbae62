use thiserror::Error;

/// Errors raised by the report core.
///
/// Only conditions that abort a run live here. Malformed numeric cells,
/// missing highlight columns and empty secondary exports are handled in
/// place and never surface as an error.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The host identifier column could not be located in a header row.
    #[error("HostID column not found in {dataset} header")]
    MissingKeyColumn { dataset: String },

    #[error("{host}: sample {index} is malformed ({reason})")]
    MalformedSample {
        host: String,
        index: usize,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
