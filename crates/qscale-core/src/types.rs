//! Shared types used across qscale crates.

use std::fmt;

use tokio::time::Instant;

/// Direction of a single replica step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleDirection {
    Up,
    Down,
}

impl ScaleDirection {
    pub fn label(&self) -> &'static str {
        match self {
            ScaleDirection::Up => "scale-up",
            ScaleDirection::Down => "scale-down",
        }
    }
}

impl fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of evaluating one backlog sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAction {
    /// Leave the workload alone this tick.
    None,
    /// Add one replica.
    ScaleUp,
    /// Remove one replica.
    ScaleDown,
}

impl ScaleAction {
    /// The replica direction this action moves in, if any.
    pub fn direction(&self) -> Option<ScaleDirection> {
        match self {
            ScaleAction::None => None,
            ScaleAction::ScaleUp => Some(ScaleDirection::Up),
            ScaleAction::ScaleDown => Some(ScaleDirection::Down),
        }
    }
}

/// When each direction last scaled successfully.
///
/// `None` means "never", so the first action in either direction is not
/// held back by its cooldown. The two timestamps are independent: a
/// scale-up never delays a scale-down and vice versa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    pub last_scale_up: Option<Instant>,
    pub last_scale_down: Option<Instant>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the last successful step in `direction`.
    pub fn last(&self, direction: ScaleDirection) -> Option<Instant> {
        match direction {
            ScaleDirection::Up => self.last_scale_up,
            ScaleDirection::Down => self.last_scale_down,
        }
    }

    /// Record a successful step in `direction`, issued at `at`.
    pub fn record(&mut self, direction: ScaleDirection, at: Instant) {
        match direction {
            ScaleDirection::Up => self.last_scale_up = Some(at),
            ScaleDirection::Down => self.last_scale_down = Some(at),
        }
    }
}
