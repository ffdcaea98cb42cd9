//! End-to-end control loop scenarios.
//!
//! Runs the real loop against in-memory queue and deployment doubles on
//! tokio's paused clock, so "15 seconds" of polling takes no wall time.

use std::time::Duration;

use tokio::sync::watch;

use qscale_autoscale::{ControlLoop, ScaleTarget, TickOutcome};
use qscale_core::testing::{FakeDeployment, FakeQueue};
use qscale_core::{ScaleDirection, ScalingConfig, WorkloadRef};

fn config(poll: u64, up_cooldown: u64, down_cooldown: u64) -> ScalingConfig {
    ScalingConfig {
        poll_interval: Duration::from_secs(poll),
        scale_up_cooldown: Duration::from_secs(up_cooldown),
        scale_down_cooldown: Duration::from_secs(down_cooldown),
        scale_up_messages: 100,
        scale_down_messages: 10,
        min_replicas: 1,
        max_replicas: 5,
    }
}

fn build(
    config: &ScalingConfig,
    backlog: u64,
    replicas: i32,
) -> (ControlLoop<FakeQueue, FakeDeployment>, FakeQueue, FakeDeployment) {
    let queue = FakeQueue::with_depth(backlog);
    let deployment = FakeDeployment::with_replicas(replicas);
    let target = ScaleTarget::new(deployment.clone(), WorkloadRef::new("test", "test"), config);
    (ControlLoop::new(queue.clone(), target, config), queue, deployment)
}

/// Run the loop for `elapsed` of virtual time, then shut it down.
async fn run_for(mut control: ControlLoop<FakeQueue, FakeDeployment>, elapsed: Duration) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        control.run(shutdown_rx).await;
    });

    tokio::time::sleep(elapsed).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sustained_backlog_reaches_max_replicas() {
    let config = config(1, 1, 1);
    let (control, _queue, deployment) = build(&config, 100, 3);

    run_for(control, Duration::from_secs(10)).await;

    assert_eq!(deployment.replicas(), 5, "replicas should be held at max");
    assert_eq!(deployment.writes(), 2, "no writes once the bound is reached");
}

#[tokio::test(start_paused = true)]
async fn drained_queue_reaches_min_replicas() {
    let config = config(1, 1, 1);
    let (control, _queue, deployment) = build(&config, 10, 3);

    run_for(control, Duration::from_secs(10)).await;

    assert_eq!(deployment.replicas(), 1, "replicas should be held at min");
    assert_eq!(deployment.writes(), 2);
}

#[tokio::test(start_paused = true)]
async fn scale_up_cooldown_is_obeyed() {
    let mut config = config(5, 10, 10);
    config.max_replicas = 10;
    let (control, _queue, deployment) = build(&config, 100, 3);

    // Ticks at t=0, 5, 10, 15: scale-ups at 0 and 10 only.
    run_for(control, Duration::from_secs(15)).await;

    assert_eq!(deployment.replicas(), 5, "two scale-ups, not three");
}

#[tokio::test(start_paused = true)]
async fn scale_down_cooldown_is_obeyed() {
    let config = config(5, 10, 10);
    let (control, _queue, deployment) = build(&config, 10, 5);

    run_for(control, Duration::from_secs(15)).await;

    assert_eq!(deployment.replicas(), 3, "two scale-downs, not three");
}

#[tokio::test(start_paused = true)]
async fn direction_flip_is_not_blocked_by_other_cooldown() {
    let config = config(5, 60, 60);
    let (mut control, queue, deployment) = build(&config, 100, 3);

    assert!(matches!(
        control.tick().await,
        TickOutcome::Scaled { direction: ScaleDirection::Up, replicas: 4, .. }
    ));

    tokio::time::advance(Duration::from_secs(5)).await;
    queue.set_depth(0);
    assert!(matches!(
        control.tick().await,
        TickOutcome::Scaled { direction: ScaleDirection::Down, replicas: 3, .. }
    ));

    tokio::time::advance(Duration::from_secs(5)).await;
    queue.set_depth(100);
    assert_eq!(
        control.tick().await,
        TickOutcome::CoolingDown { direction: ScaleDirection::Up, backlog: 100 }
    );
    assert_eq!(deployment.writes(), 2);
}

#[tokio::test(start_paused = true)]
async fn out_of_band_changes_are_picked_up() {
    let config = config(1, 0, 0);
    let (mut control, _queue, deployment) = build(&config, 100, 3);

    assert!(matches!(control.tick().await, TickOutcome::Scaled { replicas: 4, .. }));

    // An operator drops the workload to 1 between ticks.
    deployment.set_replicas_out_of_band(1);
    assert!(matches!(control.tick().await, TickOutcome::Scaled { replicas: 2, .. }));

    // And then pins it at the max.
    deployment.set_replicas_out_of_band(5);
    assert!(matches!(control.tick().await, TickOutcome::AtBound { replicas: 5, .. }));
    assert_eq!(deployment.replicas(), 5);
}

#[tokio::test(start_paused = true)]
async fn loop_survives_outages() {
    let config = config(1, 0, 0);
    let (mut control, queue, deployment) = build(&config, 100, 3);

    queue.set_failing(true);
    assert_eq!(control.tick().await, TickOutcome::NoSignal);

    queue.set_failing(false);
    deployment.set_fail_reads(true);
    assert!(matches!(control.tick().await, TickOutcome::BackendFailed { .. }));

    deployment.set_fail_reads(false);
    assert!(matches!(control.tick().await, TickOutcome::Scaled { replicas: 4, .. }));
    assert_eq!(control.cooldown().last_scale_down, None);
}
