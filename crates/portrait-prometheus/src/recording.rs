// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions.
//!
//! Counters are incremented at their call sites through the metrics-rs
//! facade; this module only names and describes them.

use metrics::{Unit, describe_counter};

pub const VARIATIONS_TOTAL: &str = "portrait_variations_total";
pub const FALLBACKS_TOTAL: &str = "portrait_fallbacks_total";
pub const TICKS_TOTAL: &str = "portrait_ticks_total";
pub const RATE_LIMIT_WAITS_TOTAL: &str = "portrait_rate_limit_waits_total";

/// Register all portrait metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        VARIATIONS_TOTAL,
        Unit::Count,
        "Variations produced, by strategy (remote or local)"
    );
    describe_counter!(
        FALLBACKS_TOTAL,
        Unit::Count,
        "Remote variations replaced by a local filter after a provider failure"
    );
    describe_counter!(TICKS_TOTAL, Unit::Count, "Rotation ticks, by outcome");
    describe_counter!(
        RATE_LIMIT_WAITS_TOTAL,
        Unit::Count,
        "Times a request waited for the provider rate-limit window"
    );
}
