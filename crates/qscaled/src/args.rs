//! Command line / environment configuration layer.
//!
//! Every flag is optional so that values from `--config` survive unless a
//! flag (or its environment variable) overrides them.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use qscale_core::config::{RawQueue, RawScaling, RawWorkload};
use qscale_core::{ConfigResult, RawConfig, ScalerConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// TOML config file; flags override values from it.
    #[arg(long, env = "QSCALE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interval between queue depth samples (e.g. 5s, 500ms).
    #[arg(long, env = "QSCALE_POLL_PERIOD")]
    pub poll_period: Option<String>,

    /// Minimum time between two scale-ups.
    #[arg(long = "scale-up-cool-down", env = "QSCALE_SCALE_UP_COOL_DOWN")]
    pub scale_up_cool_down: Option<String>,

    /// Minimum time between two scale-downs.
    #[arg(long = "scale-down-cool-down", env = "QSCALE_SCALE_DOWN_COOL_DOWN")]
    pub scale_down_cool_down: Option<String>,

    /// Backlog at or above which to add a replica.
    #[arg(long, env = "QSCALE_SCALE_UP_MESSAGES")]
    pub scale_up_messages: Option<u64>,

    /// Backlog at or below which to remove a replica.
    #[arg(long, env = "QSCALE_SCALE_DOWN_MESSAGES")]
    pub scale_down_messages: Option<u64>,

    /// Never scale below this many replicas.
    #[arg(long, env = "QSCALE_MIN_PODS")]
    pub min_pods: Option<i32>,

    /// Never scale above this many replicas.
    #[arg(long, env = "QSCALE_MAX_PODS")]
    pub max_pods: Option<i32>,

    /// URL of the SQS queue to watch.
    #[arg(long, env = "QSCALE_SQS_QUEUE_URL")]
    pub sqs_queue_url: Option<String>,

    /// AWS region of the queue.
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// SQS endpoint override.
    #[arg(long, env = "QSCALE_SQS_ENDPOINT")]
    pub sqs_endpoint: Option<String>,

    /// Namespace of the Deployment to scale.
    #[arg(long, env = "QSCALE_KUBERNETES_NAMESPACE")]
    pub kubernetes_namespace: Option<String>,

    /// Name of the Deployment to scale.
    #[arg(long, env = "QSCALE_KUBERNETES_DEPLOYMENT")]
    pub kubernetes_deployment: Option<String>,
}

impl ConfigArgs {
    /// The flag layer on its own.
    pub fn overrides(&self) -> RawConfig {
        RawConfig {
            scaling: RawScaling {
                poll_interval: self.poll_period.clone(),
                scale_up_cooldown: self.scale_up_cool_down.clone(),
                scale_down_cooldown: self.scale_down_cool_down.clone(),
                scale_up_messages: self.scale_up_messages,
                scale_down_messages: self.scale_down_messages,
                min_replicas: self.min_pods,
                max_replicas: self.max_pods,
            },
            queue: RawQueue {
                url: self.sqs_queue_url.clone(),
                region: self.aws_region.clone(),
                endpoint: self.sqs_endpoint.clone(),
            },
            workload: RawWorkload {
                namespace: self.kubernetes_namespace.clone(),
                name: self.kubernetes_deployment.clone(),
            },
        }
    }

    /// Config file (if any) with flags layered on top, resolved and
    /// validated.
    pub fn load(&self) -> ConfigResult<ScalerConfig> {
        let base = match &self.config {
            Some(path) => RawConfig::from_file(path)?,
            None => RawConfig::default(),
        };
        base.merge(self.overrides()).resolve()
    }
}
