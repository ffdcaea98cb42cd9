//! qscale-autoscale — queue-depth driven replica scaling.
//!
//! Samples the approximate backlog of a queue on a fixed cadence and
//! moves a workload's replica count one step at a time, within
//! `[min_replicas, max_replicas]`, behind independent scale-up and
//! scale-down cooldowns.
//!
//! # Scaling Algorithm
//!
//! ```text
//! backlog = queue.approximate_depth()
//!
//! if backlog >= scale_up_messages and now - last_scale_up >= scale_up_cooldown:
//!     ScaleUp      // r = read(); if r >= max: refuse; else write(r + 1)
//! elif backlog <= scale_down_messages and now - last_scale_down >= scale_down_cooldown:
//!     ScaleDown    // r = read(); if r <= min: refuse; else write(r - 1)
//! ```
//!
//! Only a confirmed write starts a cooldown. A failed sample, a bound
//! refusal or a backend error leaves both timers untouched.

pub mod control_loop;
pub mod policy;
pub mod target;

pub use control_loop::{ControlLoop, TickOutcome};
pub use policy::decide;
pub use target::ScaleTarget;
