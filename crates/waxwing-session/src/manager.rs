// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection manager: session registry, event pump, and effect
//! execution.
//!
//! One pump task per live transport link consumes that session's event
//! channel sequentially; every side effect of an event completes before
//! the next event for that session is processed. Cross-session work is
//! independent. Reconnects are armed as cancelable timers so a manual
//! `start` or `teardown` supersedes a pending schedule.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use waxwing_broadcast::RealtimeBroadcaster;
use waxwing_config::{SessionConfig, WaxwingConfig};
use waxwing_core::error::WaxwingError;
use waxwing_core::traits::credentials::CredentialStore;
use waxwing_core::traits::flush::FlushSink;
use waxwing_core::traits::render::PairingRenderer;
use waxwing_core::traits::transport::{TransportAdapter, TransportLink};
use waxwing_core::types::{ChatMessage, SessionState, TransportEvent};
use waxwing_limiter::{CreationLimiter, SendLimiter};
use waxwing_store::{MessageStore, SearchIndex};

use crate::errors::{PairingRefreshError, SendError, SendReceipt, SessionNotFound, StartError};
use crate::fsm::{self, Effect};
use crate::record::SessionRecord;

struct SessionEntry {
    record: Mutex<SessionRecord>,
    /// Cancels the pending reconnect timer, if one is armed.
    retry_cancel: Mutex<Option<CancellationToken>>,
    /// Bumped on every connect; a pump whose generation is stale ignores
    /// everything it still has buffered.
    pump_generation: AtomicU64,
}

impl SessionEntry {
    fn new(session_id: &str) -> Self {
        Self {
            record: Mutex::new(SessionRecord::new(session_id)),
            retry_cancel: Mutex::new(None),
            pump_generation: AtomicU64::new(0),
        }
    }
}

/// Owner of all session lifecycle state and the engine's composition
/// root: the store, index, broadcaster, and limiters live here.
pub struct ConnectionManager {
    config: SessionConfig,
    transport: Arc<dyn TransportAdapter>,
    credentials: Arc<dyn CredentialStore>,
    renderer: Arc<dyn PairingRenderer>,
    store: MessageStore,
    index: SearchIndex,
    broadcaster: RealtimeBroadcaster,
    send_limiter: SendLimiter,
    creation_limiter: CreationLimiter,
    sessions: DashMap<String, Arc<SessionEntry>>,
}

impl ConnectionManager {
    pub fn new(
        config: &WaxwingConfig,
        transport: Arc<dyn TransportAdapter>,
        credentials: Arc<dyn CredentialStore>,
        renderer: Arc<dyn PairingRenderer>,
        sink: Arc<dyn FlushSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: config.session.clone(),
            transport,
            credentials,
            renderer,
            store: MessageStore::new(&config.store, sink),
            index: SearchIndex::new(&config.search),
            broadcaster: RealtimeBroadcaster::new(),
            send_limiter: SendLimiter::new(&config.limiter),
            creation_limiter: CreationLimiter::new(&config.limiter),
            sessions: DashMap::new(),
        })
    }

    /// The message log owned by this engine.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// The search index fed by the message pipeline.
    pub fn search(&self) -> &SearchIndex {
        &self.index
    }

    /// The per-session event fan-out.
    pub fn broadcaster(&self) -> &RealtimeBroadcaster {
        &self.broadcaster
    }

    /// Starts (or restarts) a session.
    ///
    /// New session ids pass the creation limiter keyed by `origin`.
    /// Idempotent while a link is live: the current snapshot is returned
    /// and no second connection is made. Restarting a session in a
    /// resting or terminal state grants a fresh retry budget. In manual
    /// pairing mode the record is created `idle` and no connection is
    /// attempted until [`ConnectionManager::allow_manual_start`].
    pub async fn start(
        self: &Arc<Self>,
        session_id: &str,
        origin: &str,
    ) -> Result<SessionRecord, StartError> {
        let entry = match self.entry(session_id) {
            Some(entry) => entry,
            None => {
                self.creation_limiter.check_session_create(origin)?;
                info!(session_id, origin, "session created");
                Arc::clone(
                    self.sessions
                        .entry(session_id.to_string())
                        .or_insert_with(|| Arc::new(SessionEntry::new(session_id)))
                        .value(),
                )
            }
        };
        {
            let mut record = entry.record.lock().await;
            if record.state.has_live_link() {
                debug!(session_id, state = %record.state, "start ignored, link already live");
                return Ok(record.clone());
            }
            record.retry_count = 0;
            if self.config.manual_pairing && !record.manual_mode_allowed {
                debug!(session_id, "manual pairing mode, holding in idle");
                return Ok(record.clone());
            }
        }
        self.connect(session_id).await?;
        Ok(entry.record.lock().await.clone())
    }

    /// Clears a session to connect while the engine runs in manual
    /// pairing mode, and connects it if it is resting.
    pub async fn allow_manual_start(
        self: &Arc<Self>,
        session_id: &str,
    ) -> Result<SessionRecord, StartError> {
        let entry = self.entry(session_id).ok_or(StartError::SessionNotFound)?;
        let should_connect = {
            let mut record = entry.record.lock().await;
            record.manual_mode_allowed = true;
            !record.state.has_live_link()
        };
        if should_connect {
            self.connect(session_id).await?;
        }
        Ok(entry.record.lock().await.clone())
    }

    /// Snapshot of all lifecycle fields for a session.
    pub async fn get_state(&self, session_id: &str) -> Result<SessionRecord, SessionNotFound> {
        let entry = self.entry(session_id).ok_or(SessionNotFound)?;
        let record = entry.record.lock().await;
        Ok(record.clone())
    }

    /// Restarts the transport link so a fresh pairing code is issued.
    ///
    /// Refused while the session is open, and within the scan grace
    /// window of the previous code unless `force` is set.
    pub async fn request_pairing_refresh(
        self: &Arc<Self>,
        session_id: &str,
        force: bool,
    ) -> Result<SessionRecord, PairingRefreshError> {
        let entry = self
            .entry(session_id)
            .ok_or(PairingRefreshError::SessionNotFound)?;
        {
            let record = entry.record.lock().await;
            if record.state == SessionState::Open {
                return Err(PairingRefreshError::AlreadyOpen);
            }
            if !force {
                if let Some(remaining) = record.grace_remaining(Utc::now()) {
                    let remaining_secs =
                        (remaining.num_milliseconds().max(0) as u64).div_ceil(1_000);
                    return Err(PairingRefreshError::GraceActive { remaining_secs });
                }
            }
        }
        info!(session_id, force, "restarting link for a fresh pairing code");
        {
            let mut record = entry.record.lock().await;
            record.state = SessionState::Closing;
            record.pairing_code = None;
        }
        self.announce(session_id, SessionState::Closing);
        if let Err(error) = self.transport.stop(session_id).await {
            warn!(session_id, %error, "transport stop failed");
        }
        self.connect(session_id).await?;
        Ok(entry.record.lock().await.clone())
    }

    /// Sends a text message through an open session.
    ///
    /// The token bucket is consulted after the state check and before the
    /// transport send; an accepted send is logged (`from_me`), indexed,
    /// and broadcast like any inbound message.
    pub async fn send_text(
        &self,
        session_id: &str,
        to: &str,
        text: &str,
    ) -> Result<SendReceipt, SendError> {
        let entry = self.entry(session_id).ok_or(SendError::SessionNotFound)?;
        {
            let record = entry.record.lock().await;
            if record.state != SessionState::Open {
                return Err(SendError::NotOpen {
                    state: record.state,
                });
            }
        }
        let verdict = self.send_limiter.take_send_token(session_id);
        if !verdict.allowed {
            debug!(session_id, remaining = verdict.remaining, "send rate limited");
            return Err(SendError::RateLimited {
                remaining: verdict.remaining,
            });
        }
        let message_id = self.transport.send(session_id, to, text).await?;
        let message = ChatMessage {
            id: message_id.clone(),
            from: session_id.to_string(),
            to: Some(to.to_string()),
            text: text.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            from_me: true,
            media_type: None,
            status: Some("sent".to_string()),
        };
        self.pipeline_message(session_id, &message).await;
        Ok(SendReceipt {
            message_id,
            remaining: verdict.remaining,
        })
    }

    /// Stops the session's transport, optionally wipes its stored
    /// credentials, and removes every trace of the session from the
    /// engine (record, log, index postings, send bucket).
    pub async fn teardown(
        &self,
        session_id: &str,
        wipe_credentials: bool,
    ) -> Result<(), SessionNotFound> {
        let (_, entry) = self.sessions.remove(session_id).ok_or(SessionNotFound)?;
        self.cancel_pending_retry(&entry).await;
        entry.pump_generation.fetch_add(1, Ordering::SeqCst);
        if let Err(error) = self.transport.stop(session_id).await {
            warn!(session_id, %error, "transport stop failed during teardown");
        }
        if wipe_credentials {
            if let Err(error) = self.credentials.delete(session_id).await {
                warn!(session_id, %error, "credential wipe failed");
            }
        }
        self.store.remove_session(session_id);
        self.index.remove_session(session_id);
        self.send_limiter.remove_session(session_id);
        self.announce(session_id, SessionState::Closed);
        info!(session_id, wipe_credentials, "session torn down");
        Ok(())
    }

    fn entry(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.get(session_id).map(|e| Arc::clone(e.value()))
    }

    async fn cancel_pending_retry(&self, entry: &SessionEntry) {
        if let Some(token) = entry.retry_cancel.lock().await.take() {
            token.cancel();
        }
    }

    fn announce(&self, session_id: &str, state: SessionState) {
        self.broadcaster
            .publish(session_id, "state", json!({ "state": state.to_string() }));
    }

    async fn pipeline_message(&self, session_id: &str, message: &ChatMessage) {
        self.store.append(session_id, message.clone()).await;
        self.index.index(session_id, message);
        self.broadcaster.publish(
            session_id,
            "message",
            serde_json::to_value(message).unwrap_or(serde_json::Value::Null),
        );
    }

    /// Opens a fresh transport link and spawns its event pump.
    ///
    /// A start failure is returned to the caller and leaves the session
    /// resting in `idle`; it does not arm the retry machinery, which only
    /// covers drops after a connection was established.
    async fn connect(self: &Arc<Self>, session_id: &str) -> Result<(), WaxwingError> {
        let Some(entry) = self.entry(session_id) else {
            return Ok(());
        };
        self.cancel_pending_retry(&entry).await;
        let generation = entry.pump_generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut record = entry.record.lock().await;
            record.state = SessionState::Connecting;
            record.next_retry_at = None;
        }
        self.announce(session_id, SessionState::Connecting);

        let auth = match self.credentials.load(session_id).await {
            Ok(blob) => blob,
            Err(error) => {
                warn!(session_id, %error, "credential load failed, pairing fresh");
                None
            }
        };
        match self.transport.start(session_id, auth).await {
            Ok(link) => {
                let manager = Arc::clone(self);
                let id = session_id.to_string();
                tokio::spawn(async move {
                    manager.run_pump(id, generation, link).await;
                });
                Ok(())
            }
            Err(error) => {
                warn!(session_id, %error, "transport start failed");
                entry.record.lock().await.state = SessionState::Idle;
                self.announce(session_id, SessionState::Idle);
                Err(error)
            }
        }
    }

    /// Connect attempt on behalf of the retry schedule (no caller to
    /// surface an error to); a failure counts against the retry budget.
    fn reconnect<'a>(
        self: &'a Arc<Self>,
        session_id: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if let Err(error) = self.connect(session_id).await {
                let Some(entry) = self.entry(session_id) else {
                    return;
                };
                warn!(session_id, %error, "scheduled reconnect failed");
                let event = TransportEvent::Closed {
                    code: 0,
                    message: "reconnect attempt failed".into(),
                };
                self.apply_event(&entry, session_id, &event).await;
            }
        })
    }

    /// Consumes one link's event channel sequentially.
    ///
    /// A link that ends without a close event (transport crash) is
    /// treated as a retriable disconnect, unless a newer pump has taken
    /// over or the session is gone.
    async fn run_pump(self: Arc<Self>, session_id: String, generation: u64, mut link: TransportLink) {
        let mut saw_close = false;
        while let Some(event) = link.events.recv().await {
            let Some(entry) = self.entry(&session_id) else {
                return;
            };
            if entry.pump_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            saw_close = matches!(event, TransportEvent::Closed { .. });
            self.apply_event(&entry, &session_id, &event).await;
            if saw_close {
                break;
            }
        }
        if !saw_close {
            let Some(entry) = self.entry(&session_id) else {
                return;
            };
            if entry.pump_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if entry.record.lock().await.state.has_live_link() {
                debug!(session_id, "link ended without a close event");
                let event = TransportEvent::Closed {
                    code: 0,
                    message: "transport link lost".into(),
                };
                self.apply_event(&entry, &session_id, &event).await;
            }
        }
    }

    async fn apply_event(
        self: &Arc<Self>,
        entry: &Arc<SessionEntry>,
        session_id: &str,
        event: &TransportEvent,
    ) {
        if let TransportEvent::Closed { code, message } = event {
            warn!(session_id, code, message = %message, "transport closed");
        }
        let (effects, state) = {
            let mut record = entry.record.lock().await;
            let effects = fsm::transition(&mut record, event, &self.config, Utc::now());
            (effects, record.state)
        };
        self.execute_effects(entry, session_id, state, effects).await;
    }

    async fn execute_effects(
        self: &Arc<Self>,
        entry: &Arc<SessionEntry>,
        session_id: &str,
        state: SessionState,
        effects: Vec<Effect>,
    ) {
        for effect in effects {
            match effect {
                Effect::ShowPairingCode { code } => {
                    let blob = match self.renderer.render(&code) {
                        Ok(blob) => blob,
                        Err(error) => {
                            warn!(session_id, %error, "pairing render failed, using raw code");
                            code.clone().into_bytes()
                        }
                    };
                    entry.record.lock().await.pairing_code = Some(blob);
                    self.broadcaster
                        .publish(session_id, "qr", json!({ "code": code }));
                }
                Effect::AnnounceState => self.announce(session_id, state),
                Effect::SaveCredentials { blob } => {
                    if let Err(error) = self.credentials.save(session_id, &blob).await {
                        warn!(session_id, %error, "credential save failed");
                    }
                }
                Effect::PipelineMessage { message } => {
                    self.pipeline_message(session_id, &message).await;
                }
                Effect::UpdateStatus { message_id, status } => {
                    self.store
                        .update_status(session_id, &message_id, &status)
                        .await;
                    self.broadcaster.publish(
                        session_id,
                        "message_status",
                        json!({ "message_id": message_id, "status": status }),
                    );
                }
                Effect::ScheduleRetry { delay } => {
                    self.schedule_retry(entry, session_id, delay).await;
                }
                Effect::AutoReset => {
                    self.auto_reset(entry, session_id).await;
                }
            }
        }
    }

    async fn schedule_retry(
        self: &Arc<Self>,
        entry: &Arc<SessionEntry>,
        session_id: &str,
        delay: std::time::Duration,
    ) {
        let token = CancellationToken::new();
        {
            let mut slot = entry.retry_cancel.lock().await;
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }
        debug!(session_id, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        let manager = Arc::clone(self);
        let id = session_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    debug!(session_id = %id, "reconnect timer fired");
                    manager.reconnect(&id).await;
                }
            }
        });
    }

    /// Wipes credentials and restarts pairing from a clean slate. Fires
    /// when a pairing attempt has burned through its code budget without
    /// a scan, which usually means the stored credentials are stale.
    async fn auto_reset(self: &Arc<Self>, entry: &Arc<SessionEntry>, session_id: &str) {
        warn!(session_id, "pairing budget exhausted, wiping credentials and restarting");
        {
            let mut record = entry.record.lock().await;
            record.state = SessionState::Closing;
        }
        self.announce(session_id, SessionState::Closing);
        if let Err(error) = self.transport.stop(session_id).await {
            warn!(session_id, %error, "transport stop failed during auto reset");
        }
        if let Err(error) = self.credentials.delete(session_id).await {
            warn!(session_id, %error, "credential wipe failed during auto reset");
        }
        {
            let mut record = entry.record.lock().await;
            record.reset_for_fresh_pairing();
        }
        self.announce(session_id, SessionState::Idle);
        // Nobody is waiting on an auto reset, so a failed restart is
        // handled like a failed scheduled reconnect.
        self.reconnect(session_id).await;
    }
}
