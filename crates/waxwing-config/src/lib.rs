// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Waxwing session engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! use waxwing_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("log capacity: {}", config.store.log_capacity);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{LimiterConfig, SearchConfig, SessionConfig, StoreConfig, WaxwingConfig};

use waxwing_core::WaxwingError;

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. Runs post-deserialization validation
pub fn load_and_validate() -> Result<WaxwingConfig, WaxwingError> {
    let config = loader::load_config().map_err(|e| WaxwingError::Config(e.to_string()))?;
    validation::validate_config(&config).map_err(|errors| WaxwingError::Config(errors.join("; ")))?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<WaxwingConfig, WaxwingError> {
    let config =
        loader::load_config_from_str(toml_content).map_err(|e| WaxwingError::Config(e.to_string()))?;
    validation::validate_config(&config).map_err(|errors| WaxwingError::Config(errors.join("; ")))?;
    Ok(config)
}
