// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window throttling for session creation.
//!
//! Two windows gate every creation request: one per origin key and one
//! global. Expired timestamps are purged lazily on each call; a request
//! is recorded in both windows only when both accept it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use waxwing_config::LimiterConfig;

/// Refusal reasons for a session-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreateRefusal {
    /// The origin key has reached its per-window ceiling.
    #[error("per_origin_limit")]
    PerOriginLimit,
    /// The global per-window ceiling is reached.
    #[error("global_limit")]
    GlobalLimit,
}

/// Sliding-window limiter for session-creation requests.
pub struct CreationLimiter {
    window: Duration,
    per_origin: usize,
    global: usize,
    origins: DashMap<String, VecDeque<Instant>>,
    global_hits: Mutex<VecDeque<Instant>>,
}

impl CreationLimiter {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            window: Duration::from_secs(config.create_window_secs),
            per_origin: config.create_per_origin,
            global: config.create_global,
            origins: DashMap::new(),
            global_hits: Mutex::new(VecDeque::new()),
        }
    }

    /// Checks whether a session-creation request from `origin` may proceed.
    ///
    /// On acceptance the request is recorded in both the per-origin and
    /// global windows. On refusal nothing is recorded, so a throttled
    /// caller does not extend its own penalty.
    pub fn check_session_create(&self, origin: &str) -> Result<(), CreateRefusal> {
        let now = Instant::now();

        let mut origin_hits = self.origins.entry(origin.to_string()).or_default();
        Self::purge(&mut origin_hits, now, self.window);
        if origin_hits.len() >= self.per_origin {
            debug!(origin, count = origin_hits.len(), "creation refused: origin window full");
            return Err(CreateRefusal::PerOriginLimit);
        }

        // A poisoned lock only means another check panicked mid-update;
        // the hit log is still usable.
        let mut global_hits = match self.global_hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Self::purge(&mut global_hits, now, self.window);
        if global_hits.len() >= self.global {
            debug!(origin, count = global_hits.len(), "creation refused: global window full");
            return Err(CreateRefusal::GlobalLimit);
        }

        origin_hits.push_back(now);
        global_hits.push_back(now);
        Ok(())
    }

    /// Count of unexpired entries in an origin's window (for diagnostics).
    pub fn origin_window_count(&self, origin: &str) -> usize {
        let now = Instant::now();
        match self.origins.get_mut(origin) {
            Some(mut hits) => {
                Self::purge(&mut hits, now, self.window);
                hits.len()
            }
            None => 0,
        }
    }

    fn purge(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = hits.front() {
            if now.saturating_duration_since(*front) >= window {
                hits.pop_front();
            } else {
                break;
            }
        }
    }
}
