// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: non-zero capacities, non-zero windows, coherent backoff
//! bounds.

use crate::model::WaxwingConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<String>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WaxwingConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.session.retry_base_ms == 0 {
        errors.push("session.retry_base_ms must be greater than 0".to_string());
    }

    if config.session.retry_max_ms < config.session.retry_base_ms {
        errors.push(format!(
            "session.retry_max_ms ({}) must be at least session.retry_base_ms ({})",
            config.session.retry_max_ms, config.session.retry_base_ms
        ));
    }

    if config.store.log_capacity == 0 {
        errors.push("store.log_capacity must be greater than 0".to_string());
    }

    if config.store.query_limit == 0 {
        errors.push("store.query_limit must be greater than 0".to_string());
    }

    if config.search.result_limit == 0 {
        errors.push("search.result_limit must be greater than 0".to_string());
    }

    if config.limiter.send_capacity <= 0.0 {
        errors.push(format!(
            "limiter.send_capacity must be positive, got {}",
            config.limiter.send_capacity
        ));
    }

    if config.limiter.send_refill_per_sec <= 0.0 {
        errors.push(format!(
            "limiter.send_refill_per_sec must be positive, got {}",
            config.limiter.send_refill_per_sec
        ));
    }

    if config.limiter.create_window_secs == 0 {
        errors.push("limiter.create_window_secs must be greater than 0".to_string());
    }

    if config.limiter.create_per_origin > config.limiter.create_global {
        errors.push(format!(
            "limiter.create_per_origin ({}) must not exceed limiter.create_global ({})",
            config.limiter.create_per_origin, config.limiter.create_global
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
