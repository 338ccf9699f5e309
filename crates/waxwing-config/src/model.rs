// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Waxwing session engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Every timing and capacity threshold the engine
//! uses lives here; nothing is hardcoded in the components.

use serde::{Deserialize, Serialize};

/// Top-level Waxwing configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaxwingConfig {
    /// Session lifecycle, retry, and pairing settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Message log capacity and flush settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Full-text search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Send and session-creation rate limiting settings.
    #[serde(default)]
    pub limiter: LimiterConfig,
}

/// Session lifecycle configuration: reconnect policy, pairing-code
/// throttling, and the fatal disconnect-code set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Maximum consecutive reconnect attempts before surfacing `error`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base reconnect backoff delay in milliseconds (doubles per attempt).
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Cap on the reconnect backoff delay in milliseconds.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Seconds after issuing a pairing code during which regeneration is
    /// refused unless forced.
    #[serde(default = "default_scan_grace_secs")]
    pub scan_grace_secs: u64,

    /// Pairing-code issue count that triggers an auto credential reset.
    #[serde(default = "default_qr_max_issues")]
    pub qr_max_issues: u32,

    /// Age in seconds of the first unscanned pairing code that triggers
    /// an auto credential reset.
    #[serde(default = "default_qr_max_age_secs")]
    pub qr_max_age_secs: u64,

    /// Whether unscanned-QR loops auto-reset credentials and restart.
    #[serde(default = "default_auto_reset")]
    pub auto_reset: bool,

    /// When true, sessions are created idle and require an explicit
    /// operator action before a connection (and pairing code) is produced.
    #[serde(default)]
    pub manual_pairing: bool,

    /// Transport close codes treated as fatal (credentials rejected);
    /// every other code is retriable.
    #[serde(default = "default_fatal_close_codes")]
    pub fatal_close_codes: Vec<u16>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
            scan_grace_secs: default_scan_grace_secs(),
            qr_max_issues: default_qr_max_issues(),
            qr_max_age_secs: default_qr_max_age_secs(),
            auto_reset: default_auto_reset(),
            manual_pairing: false,
            fatal_close_codes: default_fatal_close_codes(),
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_ms() -> u64 {
    2_000
}

fn default_retry_max_ms() -> u64 {
    60_000
}

fn default_scan_grace_secs() -> u64 {
    20
}

fn default_qr_max_issues() -> u32 {
    6
}

fn default_qr_max_age_secs() -> u64 {
    300
}

fn default_auto_reset() -> bool {
    true
}

fn default_fatal_close_codes() -> Vec<u16> {
    // logged out, forbidden, multi-device mismatch, connection replaced
    vec![401, 403, 411, 440]
}

/// Message store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Per-session message log capacity; oldest entries are trimmed first.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Debounce interval in milliseconds between an append and the flush
    /// it schedules. A pending timer is never reset by further appends.
    #[serde(default = "default_flush_debounce_ms")]
    pub flush_debounce_ms: u64,

    /// Default (and maximum) number of entries a query returns.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            flush_debounce_ms: default_flush_debounce_ms(),
            query_limit: default_query_limit(),
        }
    }
}

fn default_log_capacity() -> usize {
    5_000
}

fn default_flush_debounce_ms() -> u64 {
    1_000
}

fn default_query_limit() -> usize {
    100
}

/// Full-text search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Default number of results a search returns.
    #[serde(default = "default_search_limit")]
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: default_search_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    20
}

/// Rate limiting configuration for sends and session creation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimiterConfig {
    /// Token bucket capacity for outbound sends, per session.
    #[serde(default = "default_send_capacity")]
    pub send_capacity: f64,

    /// Token bucket refill rate in tokens per second.
    #[serde(default = "default_send_refill_per_sec")]
    pub send_refill_per_sec: f64,

    /// Sliding window duration in seconds for session-creation limits.
    #[serde(default = "default_create_window_secs")]
    pub create_window_secs: u64,

    /// Maximum session creations per origin key within one window.
    #[serde(default = "default_create_per_origin")]
    pub create_per_origin: usize,

    /// Maximum session creations globally within one window.
    #[serde(default = "default_create_global")]
    pub create_global: usize,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            send_capacity: default_send_capacity(),
            send_refill_per_sec: default_send_refill_per_sec(),
            create_window_secs: default_create_window_secs(),
            create_per_origin: default_create_per_origin(),
            create_global: default_create_global(),
        }
    }
}

fn default_send_capacity() -> f64 {
    20.0
}

fn default_send_refill_per_sec() -> f64 {
    1.0
}

fn default_create_window_secs() -> u64 {
    60
}

fn default_create_per_origin() -> usize {
    5
}

fn default_create_global() -> usize {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = WaxwingConfig::default();
        assert_eq!(config.session.max_retries, 5);
        assert_eq!(config.session.scan_grace_secs, 20);
        assert_eq!(config.session.qr_max_issues, 6);
        assert!(config.session.auto_reset);
        assert!(!config.session.manual_pairing);
        assert_eq!(config.store.log_capacity, 5_000);
        assert_eq!(config.store.flush_debounce_ms, 1_000);
        assert_eq!(config.store.query_limit, 100);
        assert_eq!(config.search.result_limit, 20);
        assert_eq!(config.limiter.send_capacity, 20.0);
        assert_eq!(config.limiter.send_refill_per_sec, 1.0);
        assert_eq!(config.limiter.create_per_origin, 5);
        assert_eq!(config.limiter.create_global, 30);
    }

    #[test]
    fn fatal_codes_default_contains_logged_out() {
        let config = SessionConfig::default();
        assert!(config.fatal_close_codes.contains(&401));
        assert!(config.fatal_close_codes.contains(&440));
    }
}
