use std::time::{Duration, Instant};

use ahash::RandomState;
use moka::sync::Cache;

/// Upper bound on tracked client keys per limiter.
pub const DEFAULT_MAX_CLIENTS: u64 = 10_000;

type AttemptStore = Cache<String, Instant, RandomState>;

/// Per-client cooldown: one attempt per `window`.
///
/// Entries expire after `window`, so memory stays bounded by the number of clients seen within
/// one window (and by `max_clients`).
#[derive(Clone)]
pub struct ClientRateLimiter {
    attempts: AttemptStore,
    window: Duration,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_clients: u64) -> Self {
        let attempts = Cache::builder()
            .time_to_live(window.max(Duration::from_millis(1)))
            .max_capacity(max_clients.max(1))
            .build_with_hasher(RandomState::new());
        Self { attempts, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_limited(&self, key: &str) -> bool {
        self.attempts
            .get(key)
            .is_some_and(|last| last.elapsed() < self.window)
    }

    pub fn record_attempt(&self, key: &str) {
        self.attempts.insert(key.to_string(), Instant::now());
    }
}

impl std::fmt::Debug for ClientRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRateLimiter")
            .field("window", &self.window)
            .field("tracked", &self.attempts.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_attempt_inside_window_is_limited() {
        let limiter = ClientRateLimiter::new(Duration::from_secs(60), 16);
        assert!(!limiter.is_limited("10.0.0.1"));
        limiter.record_attempt("10.0.0.1");
        assert!(limiter.is_limited("10.0.0.1"));
        assert!(!limiter.is_limited("10.0.0.2"));
    }

    #[test]
    fn window_elapses() {
        let limiter = ClientRateLimiter::new(Duration::from_millis(50), 16);
        limiter.record_attempt("k");
        assert!(limiter.is_limited("k"));
        std::thread::sleep(Duration::from_millis(80));
        assert!(!limiter.is_limited("k"));
    }

    #[test]
    fn zero_window_never_limits() {
        let limiter = ClientRateLimiter::new(Duration::ZERO, 16);
        limiter.record_attempt("k");
        assert!(!limiter.is_limited("k"));
    }
}
