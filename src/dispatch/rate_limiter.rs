//! Per-mapping fixed-window rate limiter.
//!
//! The dispatcher needs a *keyed*, *fixed-window* limiter: each
//! `url_mapping` owns its own window and counter. `governor` models one
//! continuous token bucket per limiter instance, not a map of independent
//! fixed windows, so this is hand-rolled rather than bent to fit. Drift up
//! to 1 second against wall-clock window boundaries is acceptable.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

struct Window {
    count: u32,
    window_start: DateTime<Utc>,
}

#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<Uuid, Window>>,
}

pub struct Decision {
    pub allowed: bool,
    pub retry_after_secs: u64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to consume one request against `mapping_id`'s window.
    /// `limit` is the max requests per `window_secs`; returns whether the
    /// request is allowed and, if not, how long until the window resets.
    pub fn check(&self, mapping_id: Uuid, limit: u32, window_secs: u32) -> Decision {
        let now = Utc::now();
        let mut windows = self.windows.lock().unwrap();

        let window = windows.entry(mapping_id).or_insert(Window {
            count: 0,
            window_start: now,
        });

        let elapsed = (now - window.window_start).num_seconds();
        if elapsed >= window_secs as i64 {
            window.count = 0;
            window.window_start = now;
        }

        if window.count < limit {
            window.count += 1;
            Decision {
                allowed: true,
                retry_after_secs: 0,
            }
        } else {
            let remaining = (window_secs as i64 - elapsed).max(0) as u64;
            Decision {
                allowed: false,
                retry_after_secs: remaining,
            }
        }
    }

    pub fn reset(&self, mapping_id: Uuid) {
        self.windows.lock().unwrap().remove(&mapping_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_within_limit() {
        let limiter = RateLimiter::new();
        let id = Uuid::new_v4();
        for _ in 0..3 {
            let decision = limiter.check(id, 3, 60);
            assert!(decision.allowed);
        }
    }

    #[test]
    fn blocks_requests_over_limit_within_window() {
        let limiter = RateLimiter::new();
        let id = Uuid::new_v4();
        for _ in 0..2 {
            assert!(limiter.check(id, 2, 60).allowed);
        }
        let decision = limiter.check(id, 2, 60);
        assert!(!decision.allowed);
        assert!(decision.retry_after_secs <= 60);
    }

    #[test]
    fn separate_mappings_have_independent_windows() {
        let limiter = RateLimiter::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(limiter.check(a, 1, 60).allowed);
        assert!(!limiter.check(a, 1, 60).allowed);
        assert!(limiter.check(b, 1, 60).allowed);
    }
}
