// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./waxwing.toml` > `~/.config/waxwing/waxwing.toml`
//! > `/etc/waxwing/waxwing.toml` with environment variable overrides via the
//! `WAXWING_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WaxwingConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/waxwing/waxwing.toml` (system-wide)
/// 3. `~/.config/waxwing/waxwing.toml` (user XDG config)
/// 4. `./waxwing.toml` (local directory)
/// 5. `WAXWING_*` environment variables
pub fn load_config() -> Result<WaxwingConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaxwingConfig::default()))
        .merge(Toml::file("/etc/waxwing/waxwing.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("waxwing/waxwing.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("waxwing.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WaxwingConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaxwingConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaxwingConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaxwingConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WAXWING_SESSION_MAX_RETRIES` must map
/// to `session.max_retries`, not `session.max.retries`.
fn env_provider() -> Env {
    Env::prefixed("WAXWING_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("session_", "session.", 1)
            .replacen("store_", "store.", 1)
            .replacen("search_", "search.", 1)
            .replacen("limiter_", "limiter.", 1);
        mapped.into()
    })
}
