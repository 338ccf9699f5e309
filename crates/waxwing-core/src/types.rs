// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Waxwing workspace: session lifecycle
//! states, chat message records, and the transport event vocabulary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle states of a chat session.
///
/// `Error` is the terminal state reached when the retry budget for
/// transient disconnects is exhausted. `Fatal` is reserved for
/// non-retriable closes (credential rejection); recovering from it
/// requires an operator-triggered credential wipe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, no connection attempt in flight.
    Idle,
    /// Transport handshake in progress.
    Connecting,
    /// Waiting for the user to scan a pairing code.
    QrWait,
    /// Connected and authenticated; sends are allowed.
    Open,
    /// Close event received, shutting the link down.
    Closing,
    /// Link closed; a reconnect may be scheduled.
    Closed,
    /// Retry budget exhausted on transient failures.
    Error,
    /// Credentials rejected; no auto-retry.
    Fatal,
}

impl SessionState {
    /// Whether a transport link is live (or being established) in this state.
    pub fn has_live_link(self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::QrWait | SessionState::Open
        )
    }

    /// Whether this is a terminal state requiring operator action.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Error | SessionState::Fatal)
    }
}

/// A single chat message in a session's log.
///
/// Append-only: once stored, only the `status` field may change. The
/// timestamp is producer-supplied epoch milliseconds and is treated as
/// monotonic-ish, not validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message id, unique within its session.
    pub id: String,
    /// Sender identifier.
    pub from: String,
    /// Recipient identifier, when known.
    #[serde(default)]
    pub to: Option<String>,
    /// Message body.
    pub text: String,
    /// Producer-supplied epoch milliseconds.
    pub timestamp: i64,
    /// Whether this message was sent by the session owner.
    pub from_me: bool,
    /// Media type tag (image, audio, ...), when the message carries media.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Delivery-ack marker (sent, delivered, read, ...).
    #[serde(default)]
    pub status: Option<String>,
}

/// Events emitted by the transport collaborator for one session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A pairing code was issued and must be shown to the user.
    PairingCode { code: String },
    /// The connection is open and authenticated. `auth` carries the
    /// credential blob to persist when pairing produced fresh credentials.
    Opened { auth: Option<Vec<u8>> },
    /// The connection closed with a transport status code.
    Closed { code: u16, message: String },
    /// An inbound chat message arrived.
    MessageReceived { message: ChatMessage },
    /// A delivery-ack update for a previously logged message.
    MessageStatus { message_id: String, status: String },
}
