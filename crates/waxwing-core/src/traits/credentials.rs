// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store trait for opaque per-session auth blobs.

use async_trait::async_trait;

use crate::error::WaxwingError;

/// Persistence for per-session transport credentials.
///
/// Blobs are opaque to the engine; the transport produces and consumes
/// them. The engine loads around `start` and deletes on credential wipe.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the saved credential blob for a session, if any.
    async fn load(&self, session_id: &str) -> Result<Option<Vec<u8>>, WaxwingError>;

    /// Saves (or replaces) the credential blob for a session.
    async fn save(&self, session_id: &str, blob: &[u8]) -> Result<(), WaxwingError>;

    /// Deletes any saved credential blob for a session.
    ///
    /// Deleting a session with no stored blob is not an error.
    async fn delete(&self, session_id: &str) -> Result<(), WaxwingError>;
}
