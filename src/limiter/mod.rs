//! Sliding-window rate limiter for real FMP network calls.
//!
//! Tracks the timestamps of actual (non-cached) requests and suspends the
//! caller until admitting one more call would not push the count inside
//! the trailing 60-second window above the configured limit. This bounds
//! calls within *any* trailing interval, unlike a fixed-bucket limiter,
//! at the cost of serializing admission checks through one lock - cheap
//! (microseconds) next to the network call they gate.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

/// Length of the trailing window.
const WINDOW: Duration = Duration::from_secs(60);

/// Slack added to computed waits to absorb clock/scheduling jitter.
const WAIT_BUFFER: Duration = Duration::from_millis(100);

/// Sliding-window rate limiter.
///
/// One instance per client, so multiple clients in a process are limited
/// independently. Thread-safe; admission decisions are totally ordered by
/// the internal lock.
pub struct RateLimiter {
    requests_per_minute: usize,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting at most `requests_per_minute` calls in
    /// any trailing 60-second window. A limit of zero is treated as one.
    pub fn new(requests_per_minute: usize) -> Self {
        Self {
            requests_per_minute: requests_per_minute.max(1),
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Lock the window, recovering from poison if necessary. The worst
    /// case after recovery is one slightly early admission, which beats
    /// panicking.
    fn lock_window(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.window.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter window mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Admit one real network call, suspending until window capacity is
    /// available, then record it.
    ///
    /// The lock is never held across a sleep; after waking, the window is
    /// re-checked from scratch so concurrent admitters cannot overshoot
    /// the limit between a wait computation and its expiry.
    pub async fn admit(&self) {
        loop {
            let (wait, in_window) = {
                let mut window = self.lock_window();
                let now = Instant::now();

                Self::prune(&mut window, now);

                if window.len() < self.requests_per_minute {
                    window.push_back(now);
                    debug!(
                        "Rate limiter: admitted ({} requests in last minute)",
                        window.len()
                    );
                    return;
                }

                let Some(&oldest) = window.front() else {
                    // limit >= 1, so a full window is never empty
                    window.push_back(now);
                    return;
                };

                // wait until the oldest recorded call leaves the window
                let wait = (oldest + WINDOW + WAIT_BUFFER).duration_since(now);
                (wait, window.len())
            };

            if wait.is_zero() {
                continue;
            }

            info!(
                "Rate limit: waiting {:.2}s ({} requests in last minute)",
                wait.as_secs_f64(),
                in_window
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of real calls currently recorded in the trailing window.
    pub fn in_window(&self) -> usize {
        let mut window = self.lock_window();
        Self::prune(&mut window, Instant::now());
        window.len()
    }

    /// Drop timestamps older than the trailing window. The window is
    /// append-ordered, so eviction is a prefix trim.
    fn prune(window: &mut VecDeque<Instant>, now: Instant) {
        while window
            .front()
            .is_some_and(|&oldest| now.duration_since(oldest) > WINDOW)
        {
            window.pop_front();
        }
    }
}
