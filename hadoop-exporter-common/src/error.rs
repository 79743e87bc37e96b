use thiserror::Error;

/// Common error type for the Hadoop exporters.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config: {0}")]
    Json5(#[from] json5::Error),

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream {url} returned HTTP {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Malformed upstream document: {0}")]
    MalformedDocument(String),

    #[error("Metric registered twice: {0}")]
    DuplicateMetric(String),

    #[error("Invalid metric name: {0}")]
    InvalidMetricName(String),

    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a malformed-document error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }
}

/// Result type alias using the exporter [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
