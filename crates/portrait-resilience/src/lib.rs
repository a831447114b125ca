// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for portrait.
//!
//! Currently a single primitive: a sliding-window limiter that suspends
//! callers until an outbound request fits inside the provider's quota.

pub mod rate_limit;

pub use rate_limit::{Admission, SlidingWindowLimiter};
