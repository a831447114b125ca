// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window admission control.
//!
//! The limiter remembers when each admitted request started. On every check
//! it forgets timestamps that fell out of the trailing window; if the window
//! is still full, the caller sleeps until the oldest timestamp leaves it
//! (plus a small safety margin) and checks again.
//!
//! Waiters queue on a `tokio::sync::Mutex`, whose lock is fair, so callers
//! are admitted in arrival order. There is no coordination across processes.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default admissions per window.
pub const DEFAULT_MAX_REQUESTS: usize = 5;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

/// Default extra wait once the window is full.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(100);

/// Result of a non-blocking admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request was recorded and may proceed.
    Admitted,
    /// The window is full; retrying after `retry_after` will succeed unless
    /// someone else takes the slot first.
    Exceeded { retry_after: Duration },
    /// Another caller is currently waiting for a slot.
    Contended,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Bounds outbound calls to `max_requests` per trailing `window`.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    safety_margin: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, DEFAULT_SAFETY_MARGIN)
    }
}

impl SlidingWindowLimiter {
    /// A `max_requests` of zero is treated as one.
    pub fn new(max_requests: usize, window: Duration, safety_margin: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            safety_margin,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Suspends until admitting one more request keeps the window within
    /// `max_requests`, then records the admission.
    ///
    /// The lock is held across the sleep: later callers queue behind the
    /// current waiter instead of racing it for the freed slot.
    pub async fn admit(&self) {
        let mut timestamps = self.timestamps.lock().await;
        loop {
            let now = Instant::now();
            match self.check(&mut timestamps, now) {
                Some(wait) => {
                    metrics::counter!("portrait_rate_limit_waits_total").increment(1);
                    debug!(
                        wait_ms = wait.as_millis() as u64,
                        in_window = timestamps.len(),
                        max_requests = self.max_requests,
                        "rate limit reached, waiting for window to slide"
                    );
                    tokio::time::sleep(wait).await;
                }
                None => {
                    timestamps.push_back(now);
                    return;
                }
            }
        }
    }

    /// Records an admission only if it fits right now.
    pub fn try_admit(&self) -> Admission {
        let Ok(mut timestamps) = self.timestamps.try_lock() else {
            return Admission::Contended;
        };
        let now = Instant::now();
        match self.check(&mut timestamps, now) {
            Some(retry_after) => Admission::Exceeded { retry_after },
            None => {
                timestamps.push_back(now);
                Admission::Admitted
            }
        }
    }

    /// Number of admissions still inside the trailing window.
    pub async fn in_window(&self) -> usize {
        let mut timestamps = self.timestamps.lock().await;
        self.prune(&mut timestamps, Instant::now());
        timestamps.len()
    }

    /// Prunes, then returns how long to wait when the window is full.
    fn check(&self, timestamps: &mut VecDeque<Instant>, now: Instant) -> Option<Duration> {
        self.prune(timestamps, now);
        if timestamps.len() < self.max_requests {
            return None;
        }
        let oldest = *timestamps.front()?;
        let elapsed = now.duration_since(oldest);
        Some(self.window.saturating_sub(elapsed) + self.safety_margin)
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        // Timestamps are pushed in order, so expired ones are always at the front.
        while let Some(&front) = timestamps.front() {
            if now.duration_since(front) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
