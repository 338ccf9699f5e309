// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default pairing-code renderer: QR as a terminal-friendly unicode grid.

use qrcode::QrCode;
use qrcode::render::unicode;

use waxwing_core::error::WaxwingError;
use waxwing_core::traits::render::PairingRenderer;

/// Renders pairing codes as half-block unicode QR images.
#[derive(Debug, Default)]
pub struct QrPairingRenderer;

impl QrPairingRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PairingRenderer for QrPairingRenderer {
    fn render(&self, code: &str) -> Result<Vec<u8>, WaxwingError> {
        let qr = QrCode::new(code.as_bytes()).map_err(|e| WaxwingError::Render(e.to_string()))?;
        let image = qr.render::<unicode::Dense1x2>().build();
        Ok(image.into_bytes())
    }
}
