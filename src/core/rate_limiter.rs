//! Rate limiting implementation for the edge interdiction service.
//!
//! Fixed-window counters keyed by source address. Buckets live in a sharded
//! concurrent map so that the read-check-increment for one address is atomic
//! while different addresses do not contend.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::models::RateLimitConfig;

/// Outcome of one rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current_count: u32,
}

/// Counting window for one source address
#[derive(Debug, Clone, Copy)]
struct RateLimitBucket {
    window_start: Instant,
    count: u32,
}

/// Per-client request counter.
///
/// [`RateLimiter`] is the in-process implementation; a shared keyed counter
/// service can be substituted behind the same interface.
#[cfg_attr(test, mockall::automock)]
pub trait RequestCounter: Send + Sync {
    /// Count one request from `source_address` observed at `now`
    fn check(&self, source_address: &str, now: Instant) -> RateLimitDecision;
}

/// In-memory fixed-window rate limiter
pub struct RateLimiter {
    /// Rate limit configuration
    config: RateLimitConfig,
    buckets: DashMap<String, RateLimitBucket>,
}

impl RateLimiter {
    /// Create a new rate limiter instance
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.config.window_duration()
    }

    /// Reset the rate limit for a given key
    pub fn reset(&self, source_address: &str) {
        self.buckets.remove(source_address);
    }

    /// Drop buckets whose window has expired, returning how many were removed
    pub fn cleanup(&self, now: Instant) -> usize {
        let window = self.window();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.window_start) < window);
        before.saturating_sub(self.buckets.len())
    }

    /// Number of addresses currently tracked
    pub fn tracked_sources(&self) -> usize {
        self.buckets.len()
    }
}

impl RequestCounter for RateLimiter {
    fn check(&self, source_address: &str, now: Instant) -> RateLimitDecision {
        let window = self.window();
        // The entry guard holds the shard lock for the whole update.
        let mut bucket = self
            .buckets
            .entry(source_address.to_string())
            .or_insert(RateLimitBucket {
                window_start: now,
                count: 0,
            });

        if bucket.count == 0 || now.saturating_duration_since(bucket.window_start) >= window {
            bucket.window_start = now;
            bucket.count = 1;
        } else {
            bucket.count = bucket.count.saturating_add(1);
        }

        RateLimitDecision {
            allowed: bucket.count <= self.config.max_requests,
            current_count: bucket.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            max_requests,
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn test_threshold_then_rollover() {
        let limiter = limiter(50);
        let start = Instant::now();

        for i in 1..=50 {
            let decision =
                limiter.check("203.0.113.7", start + Duration::from_millis((i - 1) * 100));
            assert!(decision.allowed, "request {} should be allowed", i);
            assert_eq!(decision.current_count, i as u32);
        }

        let decision = limiter.check("203.0.113.7", start + Duration::from_secs(6));
        assert_eq!(
            decision,
            RateLimitDecision {
                allowed: false,
                current_count: 51
            }
        );

        // Blocked polling still counts.
        let decision = limiter.check("203.0.113.7", start + Duration::from_secs(30));
        assert!(!decision.allowed);
        assert_eq!(decision.current_count, 52);

        // The window is measured from its first request.
        let decision = limiter.check("203.0.113.7", start + Duration::from_secs(60));
        assert_eq!(
            decision,
            RateLimitDecision {
                allowed: true,
                current_count: 1
            }
        );
    }

    #[test]
    fn test_addresses_are_independent() {
        let limiter = limiter(2);
        let now = Instant::now();

        assert!(limiter.check("10.0.0.1", now).allowed);
        assert!(limiter.check("10.0.0.1", now).allowed);
        assert!(!limiter.check("10.0.0.1", now).allowed);

        assert!(limiter.check("10.0.0.2", now).allowed);
        assert!(limiter.check("unknown", now).allowed);
        assert!(limiter.check("", now).allowed);
    }

    #[test]
    fn test_reset_and_cleanup() {
        let limiter = limiter(1);
        let start = Instant::now();

        limiter.check("10.0.0.1", start);
        assert!(!limiter.check("10.0.0.1", start).allowed);
        limiter.reset("10.0.0.1");
        assert!(limiter.check("10.0.0.1", start).allowed);

        limiter.check("10.0.0.2", start + Duration::from_secs(30));
        assert_eq!(limiter.tracked_sources(), 2);

        assert_eq!(limiter.cleanup(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.tracked_sources(), 1);
        assert_eq!(limiter.cleanup(start + Duration::from_secs(91)), 1);
        assert_eq!(limiter.tracked_sources(), 0);
    }

    #[test]
    fn test_concurrent_checks_are_not_lost() {
        let limiter = Arc::new(limiter(1_000));
        let now = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        limiter.check("198.51.100.1", now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(limiter.check("198.51.100.1", now).current_count, 801);
    }
}
