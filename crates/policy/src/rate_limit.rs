//! Fixed-window rate limiting, keyed by `(user_id, policy_id)`.
//!
//! Per §4.6: "Rate limiting: token-bucket or fixed window per
//! `(user_id, policy)`; default capacity 60/minute per user."

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    window_len: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::minutes(1))
    }
}

impl RateLimiter {
    pub fn new(window_len: Duration) -> Self {
        Self { windows: Mutex::new(HashMap::new()), window_len }
    }

    /// Returns `true` if the call is within `capacity`, recording it.
    pub fn check_and_record(&self, user_id: &str, policy_id: &str, capacity: u32) -> bool {
        let key = format!("{user_id}:{policy_id}");
        let now = Utc::now();
        let mut windows = self.windows.lock();
        let window = windows.entry(key).or_insert(Window { count: 0, started_at: now });

        if now - window.started_at >= self.window_len {
            window.count = 0;
            window.started_at = now;
        }

        if window.count >= capacity {
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
    fn allows_up_to_capacity_then_denies() {
        let limiter = RateLimiter::default();
        for _ in 0..60 {
            assert!(limiter.check_and_record("user-1", "policy-a", 60));
        }
        assert!(!limiter.check_and_record("user-1", "policy-a", 60));
    }

    #[test]
    fn separate_users_have_separate_windows() {
        let limiter = RateLimiter::default();
        for _ in 0..60 {
            assert!(limiter.check_and_record("user-1", "policy-a", 60));
        }
        assert!(limiter.check_and_record("user-2", "policy-a", 60));
    }
}
