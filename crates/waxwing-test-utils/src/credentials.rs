// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential store for tests.

use async_trait::async_trait;
use dashmap::DashMap;

use waxwing_core::error::WaxwingError;
use waxwing_core::traits::credentials::CredentialStore;

/// A `CredentialStore` backed by a process-local map.
#[derive(Default)]
pub struct MemoryCredentialStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a credential blob, as if a prior pairing had saved one.
    pub fn seed(&self, session_id: &str, blob: Vec<u8>) {
        self.blobs.insert(session_id.to_string(), blob);
    }

    /// Whether a blob is currently stored for a session.
    pub fn contains(&self, session_id: &str) -> bool {
        self.blobs.contains_key(session_id)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, session_id: &str) -> Result<Option<Vec<u8>>, WaxwingError> {
        Ok(self.blobs.get(session_id).map(|e| e.value().clone()))
    }

    async fn save(&self, session_id: &str, blob: &[u8]) -> Result<(), WaxwingError> {
        self.blobs.insert(session_id.to_string(), blob.to_vec());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), WaxwingError> {
        self.blobs.remove(session_id);
        Ok(())
    }
}
