// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flush sink trait for debounced message-log persistence.

use async_trait::async_trait;

use crate::error::WaxwingError;
use crate::types::ChatMessage;

/// External persistence for per-session message-log snapshots.
///
/// The store guarantees only *when* a flush fires (the debounce boundary);
/// the storage layout (e.g. one JSON document per session) is the sink's
/// concern. Flush failures are logged and retried on the next debounce
/// cycle; they never propagate into the append path.
#[async_trait]
pub trait FlushSink: Send + Sync {
    /// Persists the full current log snapshot for a session.
    async fn flush(&self, session_id: &str, messages: &[ChatMessage]) -> Result<(), WaxwingError>;
}
