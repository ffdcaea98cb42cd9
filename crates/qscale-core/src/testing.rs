//! In-memory test doubles for the collaborator traits.
//!
//! Clones share state, so a test can keep one handle to steer the fake
//! (set the backlog, drift the replica count, inject failures) while the
//! control loop owns another.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{BoxFuture, QueueDepthSource, ReplicaBackend};
use crate::error::{BackendError, MetricFetchError};

/// A queue whose depth is set directly by the test.
#[derive(Debug, Clone, Default)]
pub struct FakeQueue {
    inner: Arc<Mutex<FakeQueueState>>,
}

#[derive(Debug, Default)]
struct FakeQueueState {
    depth: u64,
    failing: bool,
    fetches: u32,
}

impl FakeQueue {
    pub fn with_depth(depth: u64) -> Self {
        let queue = Self::default();
        queue.set_depth(depth);
        queue
    }

    pub fn set_depth(&self, depth: u64) {
        self.lock().depth = depth;
    }

    /// Make every fetch fail until called again with `false`.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Number of fetch attempts, failed ones included.
    pub fn fetches(&self) -> u32 {
        self.lock().fetches
    }

    fn lock(&self) -> MutexGuard<'_, FakeQueueState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl QueueDepthSource for FakeQueue {
    fn approximate_depth(&self) -> BoxFuture<'_, Result<u64, MetricFetchError>> {
        let result = {
            let mut state = self.lock();
            state.fetches += 1;
            if state.failing {
                Err(MetricFetchError::Request {
                    queue: "fake://queue".to_string(),
                    message: "injected failure".to_string(),
                })
            } else {
                Ok(state.depth)
            }
        };
        Box::pin(async move { result })
    }
}

/// A deployment whose replica count lives in memory, like an API server
/// would hold it.
#[derive(Debug, Clone, Default)]
pub struct FakeDeployment {
    inner: Arc<Mutex<FakeDeploymentState>>,
}

#[derive(Debug, Default)]
struct FakeDeploymentState {
    replicas: i32,
    writes: u32,
    fail_reads: bool,
    fail_writes: bool,
}

impl FakeDeployment {
    pub fn with_replicas(replicas: i32) -> Self {
        let deployment = Self::default();
        deployment.set_replicas_out_of_band(replicas);
        deployment
    }

    pub fn replicas(&self) -> i32 {
        self.lock().replicas
    }

    /// Successful `set_replicas` calls so far.
    pub fn writes(&self) -> u32 {
        self.lock().writes
    }

    /// Change the count behind the autoscaler's back, as an operator or
    /// another controller would.
    pub fn set_replicas_out_of_band(&self, replicas: i32) {
        self.lock().replicas = replicas;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, FakeDeploymentState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReplicaBackend for FakeDeployment {
    fn get_replicas(&self) -> BoxFuture<'_, Result<i32, BackendError>> {
        let result = {
            let state = self.lock();
            if state.fail_reads {
                Err(BackendError::Read {
                    workload: "test/fake".to_string(),
                    message: "injected failure".to_string(),
                })
            } else {
                Ok(state.replicas)
            }
        };
        Box::pin(async move { result })
    }

    fn set_replicas(&self, replicas: i32) -> BoxFuture<'_, Result<i32, BackendError>> {
        let result = {
            let mut state = self.lock();
            if state.fail_writes {
                Err(BackendError::Write {
                    workload: "test/fake".to_string(),
                    replicas,
                    message: "injected failure".to_string(),
                })
            } else {
                state.replicas = replicas;
                state.writes += 1;
                Ok(state.replicas)
            }
        };
        Box::pin(async move { result })
    }
}
