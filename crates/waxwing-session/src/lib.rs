// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle engine.
//!
//! The [`ConnectionManager`] owns every session's lifecycle record and
//! drives it through a pure state machine ([`fsm`]) fed by transport
//! events:
//!
//! - pairing-code issue, scan-grace throttling, and the auto credential
//!   reset for unscanned QR loops;
//! - bounded reconnects with exponential backoff, a configurable fatal
//!   close-code set, and terminal `error`/`fatal` states;
//! - the inbound message pipeline (log append, index, broadcast) and
//!   rate-limited outbound sends.

pub mod backoff;
pub mod errors;
pub mod fsm;
pub mod manager;
pub mod record;
pub mod render;

pub use errors::{PairingRefreshError, SendError, SendReceipt, SessionNotFound, StartError};
pub use manager::ConnectionManager;
pub use record::SessionRecord;
pub use render::QrPairingRenderer;
