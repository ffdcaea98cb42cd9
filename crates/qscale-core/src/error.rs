//! Error types shared across qscale crates.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ScaleDirection;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid or unreadable startup configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The backlog sample for this tick could not be obtained.
#[derive(Debug, Error)]
pub enum MetricFetchError {
    #[error("queue request failed for {queue}: {message}")]
    Request { queue: String, message: String },

    #[error("queue {queue} did not report {attribute}")]
    MissingAttribute {
        queue: String,
        attribute: &'static str,
    },

    #[error("queue {queue} reported non-numeric {attribute}: {value:?}")]
    InvalidValue {
        queue: String,
        attribute: &'static str,
        value: String,
    },
}

/// A read or write against the orchestration backend failed.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to read replicas for {workload}: {message}")]
    Read { workload: String, message: String },

    #[error("failed to set replicas to {replicas} for {workload}: {message}")]
    Write {
        workload: String,
        replicas: i32,
        message: String,
    },

    #[error("{workload} reports no replica count")]
    MissingReplicas { workload: String },
}

/// Errors from a bounded scale step.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("{direction} refused for {workload}: {replicas} replicas, bound is {bound}")]
    BoundsExceeded {
        workload: String,
        direction: ScaleDirection,
        replicas: i32,
        bound: i32,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
