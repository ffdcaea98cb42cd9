//! qscaled — the qscale daemon.
//!
//! Watches the approximate depth of one SQS queue and steps one
//! Kubernetes Deployment's replica count up or down, within bounds and
//! behind per-direction cooldowns.
//!
//! # Usage
//!
//! ```text
//! qscaled run \
//!     --sqs-queue-url https://sqs.us-east-1.amazonaws.com/123456789012/jobs \
//!     --kubernetes-deployment worker \
//!     --scale-up-messages 100 --scale-down-messages 10 \
//!     --min-pods 1 --max-pods 5
//!
//! qscaled check-config --config /etc/qscale/qscale.toml
//! ```

mod args;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use qscale_autoscale::{ControlLoop, ScaleTarget};
use qscale_core::ScalerConfig;
use qscale_kube::DeploymentScaler;
use qscale_sqs::SqsQueueSource;

use crate::args::{ConfigArgs, LogFormat};

#[derive(Parser)]
#[command(name = "qscaled", about = "Scale a Kubernetes Deployment on SQS queue depth")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "QSCALE_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the autoscaler until interrupted.
    Run(ConfigArgs),
    /// Resolve and validate the configuration, then print it as TOML.
    CheckConfig(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run(args) => {
            let config = args.load().context("invalid configuration")?;
            run(config).await
        }
        Command::CheckConfig(args) => {
            let config = args.load().context("invalid configuration")?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

const DEFAULT_LOG_FILTER: &str =
    "info,qscaled=debug,qscale_autoscale=debug,qscale_sqs=debug,qscale_kube=debug";

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: ScalerConfig) -> anyhow::Result<()> {
    info!(
        workload = %config.workload,
        queue = %config.queue.url,
        "qscale daemon starting"
    );

    // ── Collaborators ──────────────────────────────────────────

    let source = SqsQueueSource::connect(&config.queue)
        .await
        .context("failed to create SQS client")?;

    let backend = DeploymentScaler::connect(&config.workload)
        .await
        .context("failed to create Kubernetes client")?;

    let target = ScaleTarget::new(backend, config.workload.clone(), &config.scaling);
    let mut control = ControlLoop::new(source, target, &config.scaling);

    // ── Control loop ───────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(async move {
        control.run(shutdown_rx).await;
    });

    shutdown_signal().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    loop_handle.await.context("control loop task failed")?;

    info!("qscale daemon stopped");
    Ok(())
}

/// Wait for Ctrl-C, or SIGTERM on unix (what the kubelet sends).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .context("failed to install CTRL+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
