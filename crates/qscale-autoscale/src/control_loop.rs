//! Control loop — sample, decide, act, on a fixed cadence.
//!
//! The loop owns the cooldown timestamps and is the only thing that ever
//! writes them, so they live in a plain field behind `&mut self`.

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use qscale_core::{
    CooldownState, QueueDepthSource, ReplicaBackend, ScaleDirection, ScaleError, ScalingConfig,
};

use crate::policy::decide;
use crate::target::ScaleTarget;

/// What a single tick ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The backlog could not be sampled; nothing else happened.
    NoSignal,
    /// The backlog sat between the thresholds.
    Held { backlog: u64 },
    /// The backlog crossed a threshold but that direction's cooldown is
    /// still running.
    CoolingDown {
        direction: ScaleDirection,
        backlog: u64,
    },
    /// A step was written and its cooldown started.
    Scaled {
        direction: ScaleDirection,
        backlog: u64,
        replicas: i32,
    },
    /// The step would have left the replica bounds; no write, no cooldown.
    AtBound {
        direction: ScaleDirection,
        backlog: u64,
        replicas: i32,
    },
    /// Reading or writing the replica count failed; no cooldown.
    BackendFailed {
        direction: ScaleDirection,
        backlog: u64,
    },
}

/// Drives one queue → one workload.
pub struct ControlLoop<S, B> {
    source: S,
    target: ScaleTarget<B>,
    config: ScalingConfig,
    cooldown: CooldownState,
}

impl<S, B> ControlLoop<S, B>
where
    S: QueueDepthSource,
    B: ReplicaBackend,
{
    /// Create a control loop. Both cooldowns start unblocked.
    pub fn new(source: S, target: ScaleTarget<B>, config: &ScalingConfig) -> Self {
        Self {
            source,
            target,
            config: *config,
            cooldown: CooldownState::new(),
        }
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    /// Run one sample-decide-act sequence.
    ///
    /// Never fails: every error is logged and folded into the outcome.
    pub async fn tick(&mut self) -> TickOutcome {
        let now = Instant::now();
        let workload = self.target.workload();

        let backlog = match self.source.approximate_depth().await {
            Ok(backlog) => backlog,
            Err(e) => {
                warn!(%workload, error = %e, "failed to sample queue backlog, skipping tick");
                return TickOutcome::NoSignal;
            }
        };

        let action = decide(backlog, now, &self.cooldown, &self.config);
        debug!(%workload, backlog, ?action, "evaluated backlog");

        let Some(direction) = action.direction() else {
            return match self.crossed_threshold(backlog) {
                Some(direction) => {
                    debug!(
                        %workload,
                        %direction,
                        backlog,
                        "waiting for cooldown, skipping {direction}"
                    );
                    TickOutcome::CoolingDown { direction, backlog }
                }
                None => TickOutcome::Held { backlog },
            };
        };

        match self.target.step(direction).await {
            Ok(replicas) => {
                self.cooldown.record(direction, now);
                TickOutcome::Scaled {
                    direction,
                    backlog,
                    replicas,
                }
            }
            Err(ScaleError::BoundsExceeded { replicas, bound, .. }) => {
                info!(%workload, %direction, replicas, bound, backlog, "replica bound reached");
                TickOutcome::AtBound {
                    direction,
                    backlog,
                    replicas,
                }
            }
            Err(ScaleError::Backend(e)) => {
                error!(%workload, %direction, backlog, error = %e, "scaling action failed");
                TickOutcome::BackendFailed { direction, backlog }
            }
        }
    }

    fn crossed_threshold(&self, backlog: u64) -> Option<ScaleDirection> {
        if backlog >= self.config.scale_up_messages {
            Some(ScaleDirection::Up)
        } else if backlog <= self.config.scale_down_messages {
            Some(ScaleDirection::Down)
        } else {
            None
        }
    }

    /// Tick every `poll_interval` until `shutdown` changes.
    ///
    /// The first tick runs immediately. A tick that overruns the interval
    /// delays the next one; ticks never overlap. A tick already in flight
    /// when shutdown arrives is allowed to finish.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            workload = %self.target.workload(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            scale_up_messages = self.config.scale_up_messages,
            scale_down_messages = self.config.scale_down_messages,
            min_replicas = self.config.min_replicas,
            max_replicas = self.config.max_replicas,
            "autoscaler started"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
            }
        }
    }
}
