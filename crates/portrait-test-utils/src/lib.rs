// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for portrait integration tests.
//!
//! Provides mock adapters and a loopback harness for fast, deterministic
//! tests without a real browser or generation provider.
//!
//! # Components
//!
//! - [`MockGenerator`] - scripted `ImageGenerator` with call capture
//! - [`SimulatedPage`] - in-memory profile page implementing `Page`
//! - [`TestHarness`] - gateway, scheduler and control handler on a loopback port

pub mod fixtures;
pub mod harness;
pub mod mock_generator;
pub mod simulated_page;

pub use fixtures::sample_png;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_generator::MockGenerator;
pub use simulated_page::SimulatedPage;
