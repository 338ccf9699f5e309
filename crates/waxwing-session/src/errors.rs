// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed refusals and receipts for the session engine's operations.
//!
//! Refusals are data, not infrastructure failures: each names the
//! precondition that was violated and carries what the caller needs to
//! back off (remaining grace, remaining token balance).

use serde::Serialize;
use thiserror::Error;

use waxwing_core::error::WaxwingError;
use waxwing_core::types::SessionState;
use waxwing_limiter::CreateRefusal;

/// The session id is not registered with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session_not_found")]
pub struct SessionNotFound;

/// Refusal or failure of a session start.
///
/// An initial transport start failure is surfaced here and is not
/// retried; the retry machinery only covers drops after a connection
/// was established.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("session_not_found")]
    SessionNotFound,

    /// The creation limiter refused a new session id.
    #[error(transparent)]
    CreationLimited(#[from] CreateRefusal),

    /// The transport rejected the connection attempt.
    #[error(transparent)]
    Transport(#[from] WaxwingError),
}

/// Refusal of a pairing-code regeneration request.
#[derive(Debug, Error)]
pub enum PairingRefreshError {
    #[error("session_not_found")]
    SessionNotFound,

    /// The session is already paired and connected; there is nothing to
    /// scan.
    #[error("session is already open")]
    AlreadyOpen,

    /// A recently issued code is still within its scan grace period.
    #[error("pairing code issued recently, {remaining_secs}s of scan grace remaining")]
    GraceActive { remaining_secs: u64 },

    /// The transport rejected the restarted connection attempt.
    #[error(transparent)]
    Transport(#[from] WaxwingError),
}

/// Refusal or failure of an outbound send.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("session_not_found")]
    SessionNotFound,

    /// Sends are only accepted in the `open` state.
    #[error("session not open (state: {state})")]
    NotOpen { state: SessionState },

    /// The per-session token bucket is empty.
    #[error("send rate limited, balance {remaining:.2}")]
    RateLimited { remaining: f64 },

    /// The transport accepted the session but rejected this send.
    #[error(transparent)]
    Transport(#[from] WaxwingError),
}

/// Acknowledgement of an accepted send.
#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    /// Transport-assigned message id, also the id of the log entry.
    pub message_id: String,
    /// Token balance left in the session's send bucket.
    pub remaining: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusals_name_their_precondition() {
        assert_eq!(SessionNotFound.to_string(), "session_not_found");
        let grace = PairingRefreshError::GraceActive { remaining_secs: 12 };
        assert_eq!(
            grace.to_string(),
            "pairing code issued recently, 12s of scan grace remaining"
        );
        let not_open = SendError::NotOpen {
            state: SessionState::QrWait,
        };
        assert_eq!(not_open.to_string(), "session not open (state: qr_wait)");
    }
}
