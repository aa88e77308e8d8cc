//! Sliding-window rate limiter for upstream providers.
//!
//! Each provider gets its own window of request timestamps covering the
//! trailing 60 seconds. A request is admitted only while the window holds
//! fewer entries than the provider's per-minute limit.
//!
//! State is in-memory and per-process; there is no cross-process coordination.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use crate::clock::Clock;

/// Length of the admission window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Limit applied to providers that were never configured.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 100;

/// How long a denied caller sleeps before asking again.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Request timestamps (epoch millis) for a single provider, oldest first.
#[derive(Debug, Default)]
struct RateWindow {
    timestamps: VecDeque<i64>,
    limit: u32,
}

impl RateWindow {
    fn with_limit(limit: u32) -> Self {
        Self {
            timestamps: VecDeque::new(),
            limit,
        }
    }

    /// Drop entries that have aged out of the window.
    fn prune(&mut self, now: i64) {
        let window = WINDOW.as_millis() as i64;
        while let Some(&oldest) = self.timestamps.front() {
            if now - oldest >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn try_admit(&mut self, now: i64) -> bool {
        self.prune(now);
        if (self.timestamps.len() as u32) < self.limit {
            self.timestamps.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-provider sliding-window rate limiter.
///
/// Thread-safe; windows are created on demand with the configured limit or
/// [`DEFAULT_REQUESTS_PER_MINUTE`] for unknown providers.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    limits: Mutex<HashMap<String, u32>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limits: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Lock the windows mutex, recovering from poison if necessary.
    ///
    /// The worst case after a poisoned lock is a slightly inaccurate window.
    fn lock_windows(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter windows mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_limits(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.limits.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter limits mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the per-minute limit for a provider, resetting its window.
    pub fn configure(&self, provider: &str, requests_per_minute: u32) {
        let mut limits = self.lock_limits();
        limits.insert(provider.to_string(), requests_per_minute);
        drop(limits); // Release limits lock before acquiring windows lock

        let mut windows = self.lock_windows();
        windows.remove(provider);
    }

    /// Limit in effect for a provider.
    pub fn limit_for(&self, provider: &str) -> u32 {
        self.lock_limits()
            .get(provider)
            .copied()
            .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE)
    }

    /// Admit a request if the provider is under its limit.
    ///
    /// Prunes expired timestamps first. On admission the current time is
    /// recorded; a denial records nothing.
    pub fn check_rate_limit(&self, provider: &str) -> bool {
        let limit = self.limit_for(provider);
        let now = self.clock.now_millis();

        let mut windows = self.lock_windows();
        let window = windows
            .entry(provider.to_string())
            .or_insert_with(|| RateWindow::with_limit(limit));

        window.try_admit(now)
    }

    /// Wait until a request for the provider is admitted.
    ///
    /// Polls [`check_rate_limit`](Self::check_rate_limit) once per second
    /// while denied.
    pub async fn wait_for_rate_limit(&self, provider: &str) {
        let mut denied = 0u32;
        while !self.check_rate_limit(provider) {
            if denied == 0 {
                debug!(
                    "Rate limiter: '{}' at {} requests/minute, waiting",
                    provider,
                    self.limit_for(provider)
                );
            }
            denied += 1;
            self.clock.sleep(POLL_INTERVAL).await;
        }
        if denied > 0 {
            debug!(
                "Rate limiter: admitted '{}' after {} polls",
                provider, denied
            );
        }
    }

    /// Requests recorded for a provider within the trailing window.
    pub fn in_window(&self, provider: &str) -> usize {
        let now = self.clock.now_millis();
        let mut windows = self.lock_windows();
        match windows.get_mut(provider) {
            Some(window) => {
                window.prune(now);
                window.timestamps.len()
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter_with(clock: Arc<ManualClock>) -> RateLimiter {
        RateLimiter::new(clock)
    }

    #[test]
    fn test_limit_plus_one_yields_single_denial() {
        let clock = ManualClock::new(0);
        let limiter = limiter_with(clock);
        limiter.configure("COINGECKO", 5);

        let results: Vec<bool> = (0..6).map(|_| limiter.check_rate_limit("COINGECKO")).collect();

        assert_eq!(results.iter().filter(|admitted| !**admitted).count(), 1);
        assert!(!results[5]);
        assert_eq!(limiter.in_window("COINGECKO"), 5);
    }

    #[test]
    fn test_denied_request_is_not_recorded() {
        let clock = ManualClock::new(0);
        let limiter = limiter_with(clock.clone());
        limiter.configure("MEMPOOL", 1);

        assert!(limiter.check_rate_limit("MEMPOOL"));
        for _ in 0..10 {
            assert!(!limiter.check_rate_limit("MEMPOOL"));
        }
        assert_eq!(limiter.in_window("MEMPOOL"), 1);

        // Only the single admitted request has to age out.
        clock.advance(WINDOW);
        assert!(limiter.check_rate_limit("MEMPOOL"));
    }

    #[test]
    fn test_window_slides() {
        let clock = ManualClock::new(0);
        let limiter = limiter_with(clock.clone());
        limiter.configure("YAHOO", 2);

        assert!(limiter.check_rate_limit("YAHOO"));
        clock.advance(Duration::from_secs(30));
        assert!(limiter.check_rate_limit("YAHOO"));
        assert!(!limiter.check_rate_limit("YAHOO"));

        // First entry is now exactly 60s old and pruned; the second is 30s old.
        clock.advance(Duration::from_secs(30));
        assert!(limiter.check_rate_limit("YAHOO"));
        assert!(!limiter.check_rate_limit("YAHOO"));
    }

    #[test]
    fn test_unknown_provider_defaults_to_100() {
        let clock = ManualClock::new(0);
        let limiter = limiter_with(clock);

        assert_eq!(limiter.limit_for("NOBODY"), DEFAULT_REQUESTS_PER_MINUTE);
        for _ in 0..DEFAULT_REQUESTS_PER_MINUTE {
            assert!(limiter.check_rate_limit("NOBODY"));
        }
        assert!(!limiter.check_rate_limit("NOBODY"));
    }

    #[test]
    fn test_per_provider_isolation() {
        let clock = ManualClock::new(0);
        let limiter = limiter_with(clock);
        limiter.configure("PROVIDER_A", 1);
        limiter.configure("PROVIDER_B", 1);

        assert!(limiter.check_rate_limit("PROVIDER_A"));
        assert!(!limiter.check_rate_limit("PROVIDER_A"));
        assert!(limiter.check_rate_limit("PROVIDER_B"));
    }

    #[tokio::test]
    async fn test_burst_of_60_against_limit_of_50() {
        let clock = ManualClock::new(0);
        let limiter = limiter_with(clock.clone());
        limiter.configure("BURST", 50);

        let mut admitted_at = Vec::new();
        for _ in 0..60 {
            limiter.wait_for_rate_limit("BURST").await;
            admitted_at.push(clock.now_millis());
        }

        let first_window = admitted_at.iter().filter(|t| **t < 60_000).count();
        assert_eq!(first_window, 50);
        assert!(admitted_at[50..].iter().all(|t| *t >= 60_000));
        // Denied callers poll once per second.
        assert!(clock.sleeps().iter().all(|d| *d == POLL_INTERVAL));
    }

    #[tokio::test]
    async fn test_window_never_exceeds_limit() {
        let clock = ManualClock::new(0);
        let limiter = limiter_with(clock.clone());
        limiter.configure("INVARIANT", 7);

        for i in 0..40 {
            limiter.wait_for_rate_limit("INVARIANT").await;
            assert!(limiter.in_window("INVARIANT") <= 7, "iteration {i}");
            clock.advance(Duration::from_millis(1_700));
        }
    }
}
