// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Waxwing session engine.
//!
//! This crate provides the shared types (session states, chat message
//! records, transport events), the infrastructure error type, and the
//! collaborator traits implemented outside the engine (transport,
//! credential store, pairing renderer, flush sink).

pub mod error;
pub mod traits;
pub mod types;

pub use error::WaxwingError;
pub use types::{ChatMessage, SessionState, TransportEvent};

pub use traits::{CredentialStore, FlushSink, PairingRenderer, TransportAdapter, TransportLink};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_has_eight_variants() {
        let variants = [
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::QrWait,
            SessionState::Open,
            SessionState::Closing,
            SessionState::Closed,
            SessionState::Error,
            SessionState::Fatal,
        ];
        assert_eq!(variants.len(), 8);
    }

    #[test]
    fn collaborator_traits_are_object_safe() {
        // If any of these traits loses object safety, this stops compiling.
        fn _transport(_: &dyn TransportAdapter) {}
        fn _credentials(_: &dyn CredentialStore) {}
        fn _renderer(_: &dyn PairingRenderer) {}
        fn _flush(_: &dyn FlushSink) {}
    }
}
