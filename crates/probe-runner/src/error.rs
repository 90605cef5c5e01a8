//! Error types for the runner
//!
//! Retryable request failures never appear here: they are recorded on the
//! affected result. These errors abort a run or a configuration load.

use probe_scenario::StoreError;
use std::path::PathBuf;

/// Failure to obtain an HTTP reply
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP method name not recognized
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Header name or value rejected by the client
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Client construction, connection, or body read failed
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Any other transport failure
    #[error("{0}")]
    Other(String),
}

/// Fatal run failure
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Checkpoint or final flush failed
    #[error("failed to persist results: {0}")]
    Store(#[from] StoreError),

    /// Request body could not be encoded
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Runner configuration could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::RunnerConfig`]
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
