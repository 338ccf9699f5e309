// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for the external real-time messaging transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::WaxwingError;
use crate::types::TransportEvent;

/// A live link to the transport for one session.
///
/// The engine owns the receiving half of the event channel; the transport
/// drops its sender when the underlying connection is torn down, which
/// ends the session's event pump.
pub struct TransportLink {
    /// Ordered stream of transport events for this session.
    pub events: mpsc::Receiver<TransportEvent>,
}

impl TransportLink {
    pub fn new(events: mpsc::Receiver<TransportEvent>) -> Self {
        Self { events }
    }
}

/// Adapter for the external real-time messaging transport.
///
/// The engine never interprets the transport's wire protocol; it issues
/// commands (`start`, `send`, `stop`) and consumes the event stream
/// carried by the [`TransportLink`]. Handshake and encryption are the
/// transport's concern.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Begins a connection attempt for a session.
    ///
    /// `auth` is the previously saved credential blob, if any; `None`
    /// triggers a fresh pairing flow on the transport side.
    async fn start(
        &self,
        session_id: &str,
        auth: Option<Vec<u8>>,
    ) -> Result<TransportLink, WaxwingError>;

    /// Sends a text message through an open connection.
    ///
    /// Returns the transport-assigned message id.
    async fn send(&self, session_id: &str, to: &str, text: &str) -> Result<String, WaxwingError>;

    /// Closes the connection for a session, if one is live.
    async fn stop(&self, session_id: &str) -> Result<(), WaxwingError>;
}
