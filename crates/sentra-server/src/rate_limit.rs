//! Fixed-window request budgeting per caller identity.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A fixed-window rate limiter.
///
/// Each caller identity gets `max_requests` per `window`; the counter
/// resets when a request arrives after the window has elapsed. This is
/// the boundary guard for the validation endpoint: exceeding it is a
/// distinct "too many requests" outcome, not a validation failure.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request for `key`; returns `false` when the budget
    /// for the current window is spent.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("limiter mutex poisoned");

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            return false;
        }

        window.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_enforced_per_key() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.allow("org-a"));
        assert!(limiter.allow("org-a"));
        assert!(limiter.allow("org-a"));
        assert!(!limiter.allow("org-a"));

        // A different caller has its own budget.
        assert!(limiter.allow("org-b"));
    }

    #[test]
    fn window_resets_after_elapsing() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(10));

        assert!(limiter.allow("org-a"));
        assert!(!limiter.allow("org-a"));

        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.allow("org-a"));
    }
}
