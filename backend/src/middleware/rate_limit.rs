use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Sliding-window limiter for failed sign-in attempts, keyed by normalised email.
pub struct RateLimiter {
    failures: Mutex<HashMap<String, Vec<Instant>>>,
    max_failures: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_failures: usize, window_secs: u64) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            max_failures,
            window: Duration::from_secs(window_secs),
        }
    }

    // A poisoned lock only means another request panicked mid-update; the map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns false once `key` has used up its failures inside the window.
    pub fn check(&self, key: &str) -> bool {
        let mut failures = self.lock();
        let now = Instant::now();

        let Some(entry) = failures.get_mut(key) else {
            return true;
        };
        entry.retain(|&time| now.duration_since(time) < self.window);
        let recent = entry.len();
        if recent == 0 {
            failures.remove(key);
        }
        recent < self.max_failures
    }

    /// Expired keys are dropped here, so keys that never come back do not
    /// accumulate.
    pub fn record_failure(&self, key: &str) {
        let mut failures = self.lock();
        let now = Instant::now();

        failures.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < self.window);
            !times.is_empty()
        });
        failures.entry(key.to_string()).or_default().push(now);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Forget past failures after a successful sign-in.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_allows_under_limit() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.check("a@example.com"));
        limiter.record_failure("a@example.com");
        assert!(limiter.check("a@example.com"));
        limiter.record_failure("a@example.com");
        assert!(limiter.check("a@example.com"));
    }

    #[test]
    fn test_blocks_after_max_failures() {
        let limiter = RateLimiter::new(2, 60);

        limiter.record_failure("a@example.com");
        limiter.record_failure("a@example.com");
        assert!(!limiter.check("a@example.com"));
    }

    #[test]
    fn test_window_expires() {
        let limiter = RateLimiter::new(2, 1);

        limiter.record_failure("a@example.com");
        limiter.record_failure("a@example.com");
        assert!(!limiter.check("a@example.com"));

        sleep(Duration::from_secs(2));

        assert!(limiter.check("a@example.com"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);

        limiter.record_failure("a@example.com");
        assert!(!limiter.check("a@example.com"));
        assert!(limiter.check("b@example.com"));
    }

    #[test]
    fn test_expired_keys_are_pruned() {
        let limiter = RateLimiter::new(5, 1);

        for i in 0..10 {
            limiter.record_failure(&format!("user{}@example.com", i));
        }
        assert_eq!(limiter.tracked_keys(), 10);

        sleep(Duration::from_secs(2));

        limiter.record_failure("fresh@example.com");
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_reset_clears_failures() {
        let limiter = RateLimiter::new(2, 60);

        limiter.record_failure("a@example.com");
        limiter.record_failure("a@example.com");
        assert!(!limiter.check("a@example.com"));

        limiter.reset("a@example.com");
        assert!(limiter.check("a@example.com"));
    }
}
