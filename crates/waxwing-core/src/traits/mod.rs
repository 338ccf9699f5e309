// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the boundary of the session engine.
//!
//! The engine consumes four externally supplied collaborators:
//! - [`TransportAdapter`]: the real-time messaging transport (handshake,
//!   pairing, delivery) treated as an event source and command sink.
//! - [`CredentialStore`]: opaque per-session auth blob persistence.
//! - [`PairingRenderer`]: turns a pairing code string into a displayable blob.
//! - [`FlushSink`]: receives debounced message-log snapshots for
//!   best-effort external persistence.

pub mod credentials;
pub mod flush;
pub mod render;
pub mod transport;

pub use credentials::CredentialStore;
pub use flush::FlushSink;
pub use render::PairingRenderer;
pub use transport::{TransportAdapter, TransportLink};
