//! Scaling policy — a pure function of backlog, time and cooldown state.

use std::time::Duration;

use tokio::time::Instant;

use qscale_core::{CooldownState, ScaleAction, ScalingConfig};

/// Decide what to do with one backlog sample.
///
/// Scale-up is checked first, so it wins if both thresholds match.
pub fn decide(
    backlog: u64,
    now: Instant,
    cooldown: &CooldownState,
    config: &ScalingConfig,
) -> ScaleAction {
    if backlog >= config.scale_up_messages
        && cooldown_elapsed(cooldown.last_scale_up, now, config.scale_up_cooldown)
    {
        return ScaleAction::ScaleUp;
    }

    if backlog <= config.scale_down_messages
        && cooldown_elapsed(cooldown.last_scale_down, now, config.scale_down_cooldown)
    {
        return ScaleAction::ScaleDown;
    }

    ScaleAction::None
}

fn cooldown_elapsed(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    last.is_none_or(|at| now.saturating_duration_since(at) >= cooldown)
}
