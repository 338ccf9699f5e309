// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session token buckets for outbound send throttling.
//!
//! Buckets refill lazily: each take first credits `elapsed_secs * rate`
//! capped at capacity, then tries to spend one token. A failed take never
//! blocks; the caller treats it as a backpressure signal.

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use waxwing_config::LimiterConfig;

/// Outcome of a token take, carrying the post-refill balance either way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendVerdict {
    /// Whether a token was consumed.
    pub allowed: bool,
    /// Remaining balance after refill (and consumption, when allowed).
    pub remaining: f64,
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter for outbound sends, one bucket per session id.
///
/// Buckets start full, so a fresh session can burst up to capacity.
/// State is process-local; restarting the process resets all buckets.
pub struct SendLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: DashMap<String, TokenBucket>,
}

impl SendLimiter {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            capacity: config.send_capacity,
            refill_per_sec: config.send_refill_per_sec,
            buckets: DashMap::new(),
        }
    }

    /// Tries to consume one send token for a session.
    ///
    /// Refill is applied before consumption, proportional to the time
    /// elapsed since the last call for this session and capped at
    /// capacity. The returned balance is always within `[0, capacity]`.
    pub fn take_send_token(&self, session_id: &str) -> SendVerdict {
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(session_id.to_string())
            .or_insert_with(|| TokenBucket {
                tokens: self.capacity,
                last_refill: now,
            });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            SendVerdict {
                allowed: true,
                remaining: bucket.tokens,
            }
        } else {
            debug!(
                session_id,
                remaining = bucket.tokens,
                "send token refused"
            );
            SendVerdict {
                allowed: false,
                remaining: bucket.tokens,
            }
        }
    }

    /// Drops the bucket for a session (called on teardown).
    pub fn remove_session(&self, session_id: &str) {
        self.buckets.remove(session_id);
    }

    /// Number of sessions with live buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limiter(capacity: f64, refill: f64) -> SendLimiter {
        SendLimiter::new(&LimiterConfig {
            send_capacity: capacity,
            send_refill_per_sec: refill,
            ..LimiterConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_bucket_allows_capacity_then_refuses() {
        let limiter = limiter(20.0, 1.0);
        for i in 0..20 {
            let verdict = limiter.take_send_token("s1");
            assert!(verdict.allowed, "take {i} should succeed");
        }
        let verdict = limiter.take_send_token("s1");
        assert!(!verdict.allowed, "21st take should be refused");
        assert!(verdict.remaining < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn refill_restores_tokens_after_wait() {
        let limiter = limiter(20.0, 1.0);
        for _ in 0..20 {
            assert!(limiter.take_send_token("s1").allowed);
        }
        assert!(!limiter.take_send_token("s1").allowed);

        tokio::time::advance(std::time::Duration::from_secs(2)).await;
        let verdict = limiter.take_send_token("s1");
        assert!(verdict.allowed, "refilled token should be spendable");
    }

    #[tokio::test(start_paused = true)]
    async fn refill_is_capped_at_capacity() {
        let limiter = limiter(5.0, 1.0);
        assert!(limiter.take_send_token("s1").allowed);

        // Far longer than needed to refill one token.
        tokio::time::advance(std::time::Duration::from_secs(3_600)).await;
        let verdict = limiter.take_send_token("s1");
        assert!(verdict.allowed);
        // capacity 5, minus the token just spent
        assert!(verdict.remaining <= 4.0 + f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn buckets_are_per_session() {
        let limiter = limiter(1.0, 1.0);
        assert!(limiter.take_send_token("s1").allowed);
        assert!(!limiter.take_send_token("s1").allowed);
        assert!(limiter.take_send_token("s2").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_session_resets_bucket() {
        let limiter = limiter(1.0, 1.0);
        assert!(limiter.take_send_token("s1").allowed);
        assert!(!limiter.take_send_token("s1").allowed);

        limiter.remove_session("s1");
        assert_eq!(limiter.bucket_count(), 0);
        // A re-created bucket starts full again.
        assert!(limiter.take_send_token("s1").allowed);
    }

    proptest! {
        #[test]
        fn balance_stays_within_bounds(takes in 1usize..200, capacity in 1.0f64..100.0) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let limiter = limiter(capacity, 1.0);
                for _ in 0..takes {
                    let verdict = limiter.take_send_token("s1");
                    prop_assert!(verdict.remaining >= 0.0);
                    prop_assert!(verdict.remaining <= capacity);
                }
                Ok(())
            })?;
        }
    }
}
