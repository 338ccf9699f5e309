// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential reconnect backoff.

use std::time::Duration;

use waxwing_config::SessionConfig;

/// Delay before reconnect attempt `attempt` (1-based): base doubled per
/// prior attempt, capped at the configured maximum.
pub fn retry_delay(config: &SessionConfig, attempt: u32) -> Duration {
    // 2^63 ms is far beyond any sane cap; clamp the exponent so the
    // shift cannot overflow.
    let exponent = attempt.saturating_sub(1).min(32);
    let ms = config
        .retry_base_ms
        .saturating_mul(1u64 << exponent)
        .min(config.retry_max_ms);
    Duration::from_millis(ms)
}
