use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinodeError {
    #[error("linode api request to {path} failed: {message}")]
    Transport { path: String, message: String },
    #[error("linode api returned status {status} for {path}: {message}")]
    Api {
        path: String,
        status: u16,
        message: String,
    },
    #[error("failed to decode linode api response from {path}: {message}")]
    Decode { path: String, message: String },
    #[error("{operation} did not finish before the scrape deadline")]
    DeadlineExceeded { operation: String },
    #[error("label cardinality mismatch for {metric}: expected {expected}, got {actual}")]
    LabelCardinality {
        metric: String,
        expected: usize,
        actual: usize,
    },
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("sample sink closed")]
    SinkClosed,
    #[error("internal error: {0}")]
    InternalError(String),
}

impl LinodeError {
    /// Short machine-readable tag used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Api { .. } => "api",
            Self::Decode { .. } => "decode",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::LabelCardinality { .. } => "label_cardinality",
            Self::DuplicateMetric(_) => "duplicate_metric",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::SinkClosed => "sink_closed",
            Self::InternalError(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, LinodeError>;
