// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flush sink that records every snapshot it receives.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use waxwing_core::error::WaxwingError;
use waxwing_core::traits::flush::FlushSink;
use waxwing_core::types::ChatMessage;

/// A `FlushSink` capturing flushed snapshots for assertions.
#[derive(Default)]
pub struct RecordingFlushSink {
    flushes: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    fail_all: AtomicBool,
}

impl RecordingFlushSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent flush fail, to exercise the best-effort path.
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Total number of flush calls observed.
    pub fn flush_count(&self) -> usize {
        self.flushes.lock().unwrap().len()
    }

    /// The most recent snapshot flushed for a session, if any.
    pub fn last_snapshot(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        self.flushes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == session_id)
            .map(|(_, messages)| messages.clone())
    }
}

#[async_trait]
impl FlushSink for RecordingFlushSink {
    async fn flush(&self, session_id: &str, messages: &[ChatMessage]) -> Result<(), WaxwingError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(WaxwingError::Flush {
                source: "injected flush failure".into(),
            });
        }
        self.flushes
            .lock()
            .unwrap()
            .push((session_id.to_string(), messages.to_vec()));
        Ok(())
    }
}
