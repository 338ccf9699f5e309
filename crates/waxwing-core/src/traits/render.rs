// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing code renderer trait.

use crate::error::WaxwingError;

/// Renders a transport pairing code into a displayable blob.
///
/// The default implementation renders a QR image; deployments with their
/// own display pipeline can substitute a pass-through or custom renderer.
pub trait PairingRenderer: Send + Sync {
    /// Renders `code` into an opaque displayable blob.
    fn render(&self, code: &str) -> Result<Vec<u8>, WaxwingError>;
}
