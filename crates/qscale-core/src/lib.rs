//! qscale-core — shared building blocks for the qscale autoscaler.
//!
//! - [`config`]: the `qscale.toml` / flag configuration model, defaults
//!   and startup validation.
//! - [`backend`]: the two narrow capabilities the control loop consumes,
//!   a queue depth source and a replica backend.
//! - [`types`]: scaling actions, directions and cooldown bookkeeping.
//! - [`error`]: the error taxonomy shared by every crate.

pub mod backend;
pub mod config;
pub mod error;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{BoxFuture, QueueDepthSource, ReplicaBackend};
pub use config::{QueueConfig, RawConfig, ScalerConfig, ScalingConfig, WorkloadRef};
pub use error::{BackendError, ConfigError, ConfigResult, MetricFetchError, ScaleError};
pub use types::*;
