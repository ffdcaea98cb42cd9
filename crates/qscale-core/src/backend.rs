//! Collaborator capabilities consumed by the control loop.
//!
//! Both traits are deliberately narrow: the loop only ever needs "how deep
//! is the queue" and "read / write the replica count". Identity (queue URL,
//! namespace + workload name) is bound when an implementation is built, so
//! none of the methods take it as an argument.

use std::future::Future;
use std::pin::Pin;

use crate::error::{BackendError, MetricFetchError};

/// Boxed, sendable future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of the approximate backlog for one queue.
pub trait QueueDepthSource: Send + Sync {
    /// Current approximate number of pending messages.
    fn approximate_depth(&self) -> BoxFuture<'_, Result<u64, MetricFetchError>>;
}

/// Replica count of one workload in one namespace.
///
/// Implementations enforce no policy; bounds live in
/// `qscale_autoscale::ScaleTarget`.
pub trait ReplicaBackend: Send + Sync {
    /// Read the replica count currently requested for the workload.
    fn get_replicas(&self) -> BoxFuture<'_, Result<i32, BackendError>>;

    /// Request `replicas` and return the count the backend confirmed.
    ///
    /// Callers must treat the returned value as authoritative; it is not
    /// guaranteed to equal `replicas`.
    fn set_replicas(&self, replicas: i32) -> BoxFuture<'_, Result<i32, BackendError>>;
}
