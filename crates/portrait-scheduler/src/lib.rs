// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler context for portrait.
//!
//! - [`RotationScheduler`] rotates the profile picture on a timer
//! - [`ControlHandler`] answers control commands
//! - [`BackendClient`] reaches the generation backend over HTTP

pub mod backend;
pub mod control;
pub mod scheduler;

pub use backend::{BackendClient, BackendHealth};
pub use control::ControlHandler;
pub use scheduler::{RotationScheduler, SchedulerOptions, SchedulerState, TickOutcome};
