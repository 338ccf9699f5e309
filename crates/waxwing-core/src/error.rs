// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Waxwing session engine.

use thiserror::Error;

/// The primary infrastructure error type used across Waxwing collaborator
/// traits and internal operations.
///
/// Domain-level refusals (rate limits, precondition violations, unknown
/// session ids) are not `WaxwingError`s; those are typed outcome enums on
/// the operations that produce them, so callers can translate them into
/// backpressure responses without string matching.
#[derive(Debug, Error)]
pub enum WaxwingError {
    /// Configuration errors (invalid TOML, out-of-range thresholds).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport collaborator errors (handshake failure, send failure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential store errors (load/save/delete of auth blobs).
    #[error("credential store error: {source}")]
    Credential {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Pairing code rendering errors.
    #[error("pairing render error: {0}")]
    Render(String),

    /// Flush sink errors (external persistence rejected a log snapshot).
    #[error("flush error: {source}")]
    Flush {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WaxwingError {
    /// Shorthand for a transport error with no underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_variants_construct() {
        let _config = WaxwingError::Config("bad".into());
        let _transport = WaxwingError::transport("socket reset");
        let _credential = WaxwingError::Credential {
            source: Box::new(std::io::Error::other("disk")),
        };
        let _render = WaxwingError::Render("code too long".into());
        let _flush = WaxwingError::Flush {
            source: Box::new(std::io::Error::other("disk")),
        };
        let _internal = WaxwingError::Internal("oops".into());
    }

    #[test]
    fn transport_shorthand_formats_message() {
        let err = WaxwingError::transport("stream ended");
        assert_eq!(err.to_string(), "transport error: stream ended");
    }
}
