// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborators and fixtures for deterministic Waxwing tests.
//!
//! - [`MockTransport`]: injectable transport events, captured commands.
//! - [`MemoryCredentialStore`]: map-backed credential blobs.
//! - [`RecordingFlushSink`]: captures flushed log snapshots.
//! - [`chat_message`]: minimal inbound message fixture.

pub mod credentials;
pub mod flush_sink;
pub mod mock_transport;

pub use credentials::MemoryCredentialStore;
pub use flush_sink::RecordingFlushSink;
pub use mock_transport::{MockTransport, SentMessage};

use waxwing_core::types::ChatMessage;

/// Builds a minimal inbound chat message for tests.
pub fn chat_message(id: &str, text: &str, timestamp: i64) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        from: "peer".to_string(),
        to: None,
        text: text.to_string(),
        timestamp,
        from_me: false,
        media_type: None,
        status: None,
    }
}
