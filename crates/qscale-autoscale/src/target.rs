//! Bounded, single-step replica changes.
//!
//! Every step re-reads the replica count from the backend right before
//! deciding whether to write. The backend is the only source of truth and
//! may have been changed out of band, so nothing is cached between calls.
//! Repeated scale-ups at `max_replicas` therefore keep failing cleanly
//! instead of overshooting.

use tracing::{debug, info};

use qscale_core::{ReplicaBackend, ScaleDirection, ScaleError, ScalingConfig, WorkloadRef};

/// A workload plus the bounds its replica count must stay within.
pub struct ScaleTarget<B> {
    backend: B,
    workload: WorkloadRef,
    min_replicas: i32,
    max_replicas: i32,
}

impl<B: ReplicaBackend> ScaleTarget<B> {
    pub fn new(backend: B, workload: WorkloadRef, config: &ScalingConfig) -> Self {
        Self {
            backend,
            workload,
            min_replicas: config.min_replicas,
            max_replicas: config.max_replicas,
        }
    }

    pub fn workload(&self) -> &WorkloadRef {
        &self.workload
    }

    /// Add one replica unless already at `max_replicas`.
    ///
    /// Returns the replica count the backend confirmed.
    pub async fn scale_up(&self) -> Result<i32, ScaleError> {
        self.step(ScaleDirection::Up).await
    }

    /// Remove one replica unless already at `min_replicas`.
    ///
    /// Returns the replica count the backend confirmed.
    pub async fn scale_down(&self) -> Result<i32, ScaleError> {
        self.step(ScaleDirection::Down).await
    }

    /// One read-check-write cycle. No retries.
    pub async fn step(&self, direction: ScaleDirection) -> Result<i32, ScaleError> {
        let current = self.backend.get_replicas().await?;

        let (at_bound, bound, desired) = match direction {
            ScaleDirection::Up => (current >= self.max_replicas, self.max_replicas, current + 1),
            ScaleDirection::Down => (current <= self.min_replicas, self.min_replicas, current - 1),
        };

        if at_bound {
            return Err(ScaleError::BoundsExceeded {
                workload: self.workload.to_string(),
                direction,
                replicas: current,
                bound,
            });
        }

        debug!(workload = %self.workload, %direction, current, desired, "writing replica count");

        let confirmed = self.backend.set_replicas(desired).await?;

        info!(
            workload = %self.workload,
            %direction,
            from = current,
            to = confirmed,
            "{direction} successful"
        );
        Ok(confirmed)
    }
}
