// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure session state machine.
//!
//! [`transition`] mutates a [`SessionRecord`] for one transport event and
//! returns the side effects the manager must perform, in order. Keeping
//! the transitions free of I/O makes every lifecycle rule testable with a
//! record, an event, and a clock value.

use std::time::Duration;

use chrono::{DateTime, Utc};

use waxwing_config::SessionConfig;
use waxwing_core::types::{ChatMessage, SessionState, TransportEvent};

use crate::backoff;
use crate::record::SessionRecord;

/// A side effect the manager must carry out after a transition.
///
/// Effects are executed in order, and all of them complete before the
/// next event for the same session is processed.
#[derive(Debug)]
pub enum Effect {
    /// Render the pairing code, stash the blob on the record, and
    /// broadcast it to subscribers.
    ShowPairingCode { code: String },
    /// Broadcast the record's (post-transition) state.
    AnnounceState,
    /// Persist a credential blob handed back by the transport.
    SaveCredentials { blob: Vec<u8> },
    /// Append to the log, index, and broadcast an accepted message.
    PipelineMessage { message: ChatMessage },
    /// Apply a delivery-ack update and broadcast it.
    UpdateStatus { message_id: String, status: String },
    /// Arm a cancelable reconnect timer.
    ScheduleRetry { delay: Duration },
    /// Wipe credentials and restart pairing from a fresh `idle` record.
    AutoReset,
}

/// Applies one transport event to a session record.
pub fn transition(
    record: &mut SessionRecord,
    event: &TransportEvent,
    config: &SessionConfig,
    now: DateTime<Utc>,
) -> Vec<Effect> {
    match event {
        TransportEvent::PairingCode { code } => {
            record.qr_issue_count += 1;
            record.qr_issued_at = Some(now);
            record.qr_first_issued_at.get_or_insert(now);
            record.scan_grace_until =
                Some(now + chrono::Duration::seconds(config.scan_grace_secs as i64));
            if config.auto_reset && pairing_budget_exhausted(record, config, now) {
                vec![Effect::AutoReset]
            } else {
                record.state = SessionState::QrWait;
                vec![
                    Effect::ShowPairingCode { code: code.clone() },
                    Effect::AnnounceState,
                ]
            }
        }
        TransportEvent::Opened { auth } => {
            record.state = SessionState::Open;
            record.retry_count = 0;
            record.pairing_code = None;
            record.qr_issued_at = None;
            record.qr_first_issued_at = None;
            record.qr_issue_count = 0;
            record.scan_grace_until = None;
            record.next_retry_at = None;
            let mut effects = Vec::new();
            if let Some(blob) = auth {
                effects.push(Effect::SaveCredentials { blob: blob.clone() });
            }
            effects.push(Effect::AnnounceState);
            effects
        }
        TransportEvent::Closed { code, .. } => {
            record.last_disconnect_code = Some(*code);
            record.last_disconnect_at = Some(now);
            record.pairing_code = None;
            record.scan_grace_until = None;
            if config.fatal_close_codes.contains(code) {
                record.state = SessionState::Fatal;
                record.critical_failure_count += 1;
                record.next_retry_at = None;
                vec![Effect::AnnounceState]
            } else if record.retry_count < config.max_retries {
                record.retry_count += 1;
                record.state = SessionState::Closed;
                let delay = backoff::retry_delay(config, record.retry_count);
                record.next_retry_at = now
                    .checked_add_signed(chrono::Duration::milliseconds(delay.as_millis() as i64));
                vec![Effect::AnnounceState, Effect::ScheduleRetry { delay }]
            } else {
                record.state = SessionState::Error;
                record.next_retry_at = None;
                vec![Effect::AnnounceState]
            }
        }
        TransportEvent::MessageReceived { message } => vec![Effect::PipelineMessage {
            message: message.clone(),
        }],
        TransportEvent::MessageStatus { message_id, status } => vec![Effect::UpdateStatus {
            message_id: message_id.clone(),
            status: status.clone(),
        }],
    }
}

/// Whether the current pairing attempt has issued too many codes or has
/// been waiting for a scan for too long.
fn pairing_budget_exhausted(
    record: &SessionRecord,
    config: &SessionConfig,
    now: DateTime<Utc>,
) -> bool {
    if record.qr_issue_count > config.qr_max_issues {
        return true;
    }
    match record.qr_first_issued_at {
        Some(first) => now - first > chrono::Duration::seconds(config.qr_max_age_secs as i64),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairing_code(code: &str) -> TransportEvent {
        TransportEvent::PairingCode {
            code: code.to_string(),
        }
    }

    #[test]
    fn pairing_code_enters_qr_wait_and_arms_grace() {
        let config = SessionConfig::default();
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");

        let effects = transition(&mut record, &pairing_code("c1"), &config, now);
        assert_eq!(record.state, SessionState::QrWait);
        assert_eq!(record.qr_issue_count, 1);
        assert_eq!(record.qr_first_issued_at, Some(now));
        assert_eq!(
            record.scan_grace_until,
            Some(now + chrono::Duration::seconds(config.scan_grace_secs as i64))
        );
        assert!(matches!(effects[0], Effect::ShowPairingCode { ref code } if code == "c1"));
        assert!(matches!(effects[1], Effect::AnnounceState));
    }

    #[test]
    fn repeated_codes_keep_first_issue_time() {
        let config = SessionConfig::default();
        let t0 = Utc::now();
        let mut record = SessionRecord::new("s1");
        transition(&mut record, &pairing_code("c1"), &config, t0);
        transition(
            &mut record,
            &pairing_code("c2"),
            &config,
            t0 + chrono::Duration::seconds(30),
        );
        assert_eq!(record.qr_issue_count, 2);
        assert_eq!(record.qr_first_issued_at, Some(t0));
    }

    #[test]
    fn code_count_overflow_triggers_auto_reset() {
        let config = SessionConfig {
            qr_max_issues: 2,
            ..SessionConfig::default()
        };
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");
        transition(&mut record, &pairing_code("c1"), &config, now);
        transition(&mut record, &pairing_code("c2"), &config, now);
        let effects = transition(&mut record, &pairing_code("c3"), &config, now);
        assert!(matches!(effects.as_slice(), [Effect::AutoReset]));
    }

    #[test]
    fn stale_unscanned_code_triggers_auto_reset() {
        let config = SessionConfig {
            qr_max_age_secs: 300,
            ..SessionConfig::default()
        };
        let t0 = Utc::now();
        let mut record = SessionRecord::new("s1");
        transition(&mut record, &pairing_code("c1"), &config, t0);

        let late = t0 + chrono::Duration::seconds(301);
        let effects = transition(&mut record, &pairing_code("c2"), &config, late);
        assert!(matches!(effects.as_slice(), [Effect::AutoReset]));
    }

    #[test]
    fn auto_reset_disabled_keeps_issuing_codes() {
        let config = SessionConfig {
            qr_max_issues: 1,
            auto_reset: false,
            ..SessionConfig::default()
        };
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");
        transition(&mut record, &pairing_code("c1"), &config, now);
        let effects = transition(&mut record, &pairing_code("c2"), &config, now);
        assert_eq!(record.state, SessionState::QrWait);
        assert!(matches!(effects[0], Effect::ShowPairingCode { .. }));
    }

    #[test]
    fn opened_resets_retry_and_pairing_state() {
        let config = SessionConfig::default();
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");
        record.retry_count = 3;
        transition(&mut record, &pairing_code("c1"), &config, now);
        record.pairing_code = Some(vec![1, 2, 3]);

        let opened = TransportEvent::Opened {
            auth: Some(vec![9, 9]),
        };
        let effects = transition(&mut record, &opened, &config, now);
        assert_eq!(record.state, SessionState::Open);
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.qr_issue_count, 0);
        assert!(record.pairing_code.is_none());
        assert!(record.scan_grace_until.is_none());
        assert!(matches!(effects[0], Effect::SaveCredentials { ref blob } if blob == &[9, 9]));
        assert!(matches!(effects[1], Effect::AnnounceState));
    }

    #[test]
    fn opened_without_fresh_credentials_saves_nothing() {
        let config = SessionConfig::default();
        let mut record = SessionRecord::new("s1");
        let effects = transition(
            &mut record,
            &TransportEvent::Opened { auth: None },
            &config,
            Utc::now(),
        );
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::AnnounceState));
    }

    #[test]
    fn fatal_close_is_terminal_with_no_retry() {
        let config = SessionConfig::default();
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");
        record.state = SessionState::Open;

        let closed = TransportEvent::Closed {
            code: 401,
            message: "logged out".into(),
        };
        let effects = transition(&mut record, &closed, &config, now);
        assert_eq!(record.state, SessionState::Fatal);
        assert_eq!(record.critical_failure_count, 1);
        assert_eq!(record.last_disconnect_code, Some(401));
        assert!(record.next_retry_at.is_none());
        assert!(matches!(effects.as_slice(), [Effect::AnnounceState]));
    }

    #[test]
    fn retriable_close_schedules_growing_backoff() {
        let config = SessionConfig::default();
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");
        record.state = SessionState::Open;

        let closed = TransportEvent::Closed {
            code: 500,
            message: "stream error".into(),
        };
        let effects = transition(&mut record, &closed, &config, now);
        assert_eq!(record.state, SessionState::Closed);
        assert_eq!(record.retry_count, 1);
        assert!(record.next_retry_at.is_some());
        assert!(matches!(
            effects.as_slice(),
            [Effect::AnnounceState, Effect::ScheduleRetry { delay }]
                if *delay == Duration::from_millis(config.retry_base_ms)
        ));

        let effects = transition(&mut record, &closed, &config, now);
        assert_eq!(record.retry_count, 2);
        assert!(matches!(
            effects.as_slice(),
            [Effect::AnnounceState, Effect::ScheduleRetry { delay }]
                if *delay == Duration::from_millis(config.retry_base_ms * 2)
        ));
    }

    #[test]
    fn retries_exhausted_surface_error_state() {
        let config = SessionConfig {
            max_retries: 1,
            ..SessionConfig::default()
        };
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");
        let closed = TransportEvent::Closed {
            code: 500,
            message: "stream error".into(),
        };

        let effects = transition(&mut record, &closed, &config, now);
        assert!(matches!(
            effects.as_slice(),
            [Effect::AnnounceState, Effect::ScheduleRetry { .. }]
        ));

        let effects = transition(&mut record, &closed, &config, now);
        assert_eq!(record.state, SessionState::Error);
        assert!(record.next_retry_at.is_none());
        assert!(matches!(effects.as_slice(), [Effect::AnnounceState]));
    }

    #[test]
    fn inbound_message_and_ack_map_to_pipeline_effects() {
        let config = SessionConfig::default();
        let now = Utc::now();
        let mut record = SessionRecord::new("s1");
        record.state = SessionState::Open;

        let message = ChatMessage {
            id: "m1".into(),
            from: "peer".into(),
            to: None,
            text: "hi".into(),
            timestamp: 1,
            from_me: false,
            media_type: None,
            status: None,
        };
        let effects = transition(
            &mut record,
            &TransportEvent::MessageReceived {
                message: message.clone(),
            },
            &config,
            now,
        );
        assert!(matches!(effects.as_slice(), [Effect::PipelineMessage { message: m }] if m.id == "m1"));

        let effects = transition(
            &mut record,
            &TransportEvent::MessageStatus {
                message_id: "m1".into(),
                status: "read".into(),
            },
            &config,
            now,
        );
        assert!(matches!(
            effects.as_slice(),
            [Effect::UpdateStatus { message_id, status }] if message_id == "m1" && status == "read"
        ));
    }
}
