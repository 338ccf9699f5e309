// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockTransport` implements `TransportAdapter` with injectable events
//! and captured commands for assertion in tests. Each `start` opens a
//! fresh event channel; tests drive the session by emitting events into
//! it with [`MockTransport::emit`].

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use waxwing_core::error::WaxwingError;
use waxwing_core::traits::transport::{TransportAdapter, TransportLink};
use waxwing_core::types::TransportEvent;

/// A captured outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub session_id: String,
    pub to: String,
    pub text: String,
}

/// A mock messaging transport for testing.
///
/// Captures `start`/`send`/`stop` calls and lets tests emit transport
/// events into the link created by the most recent `start` for a
/// session. Starting a session again replaces the previous link, which
/// closes its event channel.
#[derive(Default)]
pub struct MockTransport {
    links: DashMap<String, mpsc::Sender<TransportEvent>>,
    starts: Mutex<Vec<(String, bool)>>,
    sent: Mutex<Vec<SentMessage>>,
    stops: Mutex<Vec<String>>,
    fail_next_start: AtomicBool,
    next_send_id: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a transport event into a session's live link.
    ///
    /// Panics if the session has no live link; tests should `start` first.
    pub async fn emit(&self, session_id: &str, event: TransportEvent) {
        let tx = self
            .links
            .get(session_id)
            .map(|e| e.value().clone())
            .unwrap_or_else(|| panic!("no live link for session {session_id}"));
        tx.send(event).await.expect("link receiver dropped");
    }

    /// Closes a session's link without a `stop` call, as a transport
    /// would when the remote end disappears.
    pub fn drop_link(&self, session_id: &str) {
        self.links.remove(session_id);
    }

    /// Arranges for the next `start` call to fail.
    pub fn fail_next_start(&self) {
        self.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// All `start` calls so far, as `(session_id, had_auth_blob)` pairs.
    pub fn start_calls(&self) -> Vec<(String, bool)> {
        self.starts.lock().unwrap().clone()
    }

    /// Number of `start` calls for one session.
    pub fn start_count(&self, session_id: &str) -> usize {
        self.starts
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == session_id)
            .count()
    }

    /// All messages passed to `send`.
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Session ids passed to `stop`, in order.
    pub fn stop_calls(&self) -> Vec<String> {
        self.stops.lock().unwrap().clone()
    }

    /// Whether a live link exists for a session.
    pub fn has_link(&self, session_id: &str) -> bool {
        self.links.contains_key(session_id)
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn start(
        &self,
        session_id: &str,
        auth: Option<Vec<u8>>,
    ) -> Result<TransportLink, WaxwingError> {
        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(WaxwingError::transport("injected start failure"));
        }
        self.starts
            .lock()
            .unwrap()
            .push((session_id.to_string(), auth.is_some()));

        let (tx, rx) = mpsc::channel(64);
        self.links.insert(session_id.to_string(), tx);
        Ok(TransportLink::new(rx))
    }

    async fn send(&self, session_id: &str, to: &str, text: &str) -> Result<String, WaxwingError> {
        if !self.links.contains_key(session_id) {
            return Err(WaxwingError::transport("no live connection"));
        }
        self.sent.lock().unwrap().push(SentMessage {
            session_id: session_id.to_string(),
            to: to.to_string(),
            text: text.to_string(),
        });
        let n = self.next_send_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mock-msg-{n}"))
    }

    async fn stop(&self, session_id: &str) -> Result<(), WaxwingError> {
        self.stops.lock().unwrap().push(session_id.to_string());
        self.links.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_opens_link_and_emit_delivers() {
        let transport = MockTransport::new();
        let mut link = transport.start("s1", None).await.unwrap();
        transport.emit("s1", TransportEvent::Opened { auth: None }).await;

        match link.events.recv().await {
            Some(TransportEvent::Opened { .. }) => {}
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(transport.start_calls(), vec![("s1".to_string(), false)]);
    }

    #[tokio::test]
    async fn injected_start_failure_fires_once() {
        let transport = MockTransport::new();
        transport.fail_next_start();
        assert!(transport.start("s1", None).await.is_err());
        assert!(transport.start("s1", None).await.is_ok());
    }

    #[tokio::test]
    async fn send_requires_live_link() {
        let transport = MockTransport::new();
        assert!(transport.send("s1", "bob", "hi").await.is_err());

        let _link = transport.start("s1", None).await.unwrap();
        let id = transport.send("s1", "bob", "hi").await.unwrap();
        assert!(id.starts_with("mock-msg-"));
        assert_eq!(transport.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn stop_closes_link() {
        let transport = MockTransport::new();
        let mut link = transport.start("s1", None).await.unwrap();
        transport.stop("s1").await.unwrap();
        assert!(!transport.has_link("s1"));
        assert!(link.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn restart_replaces_previous_link() {
        let transport = MockTransport::new();
        let mut first = transport.start("s1", None).await.unwrap();
        let _second = transport.start("s1", Some(vec![1])).await.unwrap();

        // The first link's sender was dropped by the replacement.
        assert!(first.events.recv().await.is_none());
        assert_eq!(transport.start_count("s1"), 2);
    }
}
