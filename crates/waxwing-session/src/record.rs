// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session lifecycle record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use waxwing_core::types::SessionState;

/// The full lifecycle state of one session.
///
/// Invariants maintained by the transition logic:
/// - `qr_wait` implies `pairing_code` is present; `open` implies it is
///   absent.
/// - `retry_count` resets to 0 exactly on the transition into `open`
///   (and on an explicit operator start).
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    /// Caller-chosen session identifier.
    pub id: String,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Rendered pairing-code blob, present only while waiting for a scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<Vec<u8>>,
    /// When the most recent pairing code was issued.
    pub qr_issued_at: Option<DateTime<Utc>>,
    /// When the first pairing code of the current pairing attempt was
    /// issued; drives the age-based auto-reset.
    pub qr_first_issued_at: Option<DateTime<Utc>>,
    /// Pairing codes issued in the current pairing attempt.
    pub qr_issue_count: u32,
    /// Consecutive reconnect attempts since the last `open`.
    pub retry_count: u32,
    /// Fatal disconnects observed over the record's lifetime.
    pub critical_failure_count: u32,
    /// Transport code of the most recent disconnect.
    pub last_disconnect_code: Option<u16>,
    /// When the most recent disconnect happened.
    pub last_disconnect_at: Option<DateTime<Utc>>,
    /// When the next scheduled reconnect will fire, if one is pending.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Whether an operator has cleared this session to connect while the
    /// engine runs in manual pairing mode.
    pub manual_mode_allowed: bool,
    /// Until when pairing-code regeneration is refused unless forced.
    pub scan_grace_until: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
            pairing_code: None,
            qr_issued_at: None,
            qr_first_issued_at: None,
            qr_issue_count: 0,
            retry_count: 0,
            critical_failure_count: 0,
            last_disconnect_code: None,
            last_disconnect_at: None,
            next_retry_at: None,
            manual_mode_allowed: false,
            scan_grace_until: None,
        }
    }

    /// Clears pairing and retry state back to a fresh `idle`, keeping the
    /// id and the lifetime failure counters. Used by the auto credential
    /// reset.
    pub fn reset_for_fresh_pairing(&mut self) {
        self.state = SessionState::Idle;
        self.pairing_code = None;
        self.qr_issued_at = None;
        self.qr_first_issued_at = None;
        self.qr_issue_count = 0;
        self.retry_count = 0;
        self.next_retry_at = None;
        self.scan_grace_until = None;
    }

    /// Remaining scan grace at `now`, if any is still active.
    pub fn grace_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let until = self.scan_grace_until?;
        let remaining = until - now;
        (remaining > chrono::Duration::zero()).then_some(remaining)
    }
}
