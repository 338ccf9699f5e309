// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-session message log with debounced external flush.
//!
//! Each session owns an in-memory log capped at a configured capacity;
//! exceeding the cap evicts the oldest entries (FIFO). Writes to the
//! external [`FlushSink`] are debounced: the first append or status
//! update after a quiet period schedules a flush, and further writes
//! while that timer is pending do not reset it, bounding flush latency
//! to one debounce interval.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use waxwing_config::StoreConfig;
use waxwing_core::types::ChatMessage;
use waxwing_core::FlushSink;

/// Filters for [`MessageStore::query`]. All supplied filters must match.
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    /// Maximum entries to return; defaults to (and is capped at) the
    /// configured query limit.
    pub limit: Option<usize>,
    /// Only messages with timestamp strictly below this value.
    pub before: Option<i64>,
    /// Only messages with timestamp strictly above this value.
    pub after: Option<i64>,
    /// Only messages from this sender.
    pub from: Option<String>,
    /// Only inbound or only outbound messages.
    pub direction: Option<Direction>,
    /// Case-insensitive substring filter on the message text.
    pub search: Option<String>,
}

/// Message direction relative to the session owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Received by the session owner (`from_me == false`).
    Inbound,
    /// Sent by the session owner (`from_me == true`).
    Outbound,
}

struct SessionLog {
    messages: VecDeque<ChatMessage>,
    flush_scheduled: bool,
}

/// In-memory message store for all sessions, one bounded log per id.
///
/// Constructed once at process start and shared by handle; only the
/// store mutates its own map.
pub struct MessageStore {
    capacity: usize,
    debounce: Duration,
    query_limit: usize,
    sink: Arc<dyn FlushSink>,
    logs: DashMap<String, Arc<Mutex<SessionLog>>>,
}

impl MessageStore {
    pub fn new(config: &StoreConfig, sink: Arc<dyn FlushSink>) -> Self {
        Self {
            capacity: config.log_capacity,
            debounce: Duration::from_millis(config.flush_debounce_ms),
            query_limit: config.query_limit,
            sink,
            logs: DashMap::new(),
        }
    }

    /// Appends a message to a session's log, evicting from the head if
    /// the capacity is exceeded, and schedules a debounced flush.
    pub async fn append(&self, session_id: &str, message: ChatMessage) {
        let log = self.log_handle(session_id);
        let mut guard = log.lock().await;
        guard.messages.push_back(message);
        while guard.messages.len() > self.capacity {
            guard.messages.pop_front();
        }
        self.schedule_flush(session_id, &log, &mut guard);
    }

    /// Updates the `status` field of an existing message. No-op when the
    /// message is not found (it may have been evicted).
    pub async fn update_status(&self, session_id: &str, message_id: &str, status: &str) {
        let Some(log) = self.logs.get(session_id).map(|e| Arc::clone(e.value())) else {
            return;
        };
        let mut guard = log.lock().await;
        // Acks usually refer to recent messages, so scan from the tail.
        let Some(msg) = guard
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.id == message_id)
        else {
            return;
        };
        msg.status = Some(status.to_string());
        self.schedule_flush(session_id, &log, &mut guard);
    }

    /// Returns the most recent messages matching all supplied filters,
    /// in ascending timestamp (original log) order.
    pub async fn query(&self, session_id: &str, query: &MessageQuery) -> Vec<ChatMessage> {
        let Some(log) = self.logs.get(session_id).map(|e| Arc::clone(e.value())) else {
            return Vec::new();
        };
        let guard = log.lock().await;
        let limit = query
            .limit
            .map_or(self.query_limit, |l| l.min(self.query_limit));

        let needle = query.search.as_ref().map(|s| s.to_lowercase());
        let mut matched: Vec<&ChatMessage> = guard
            .messages
            .iter()
            .filter(|m| {
                query.before.is_none_or(|t| m.timestamp < t)
                    && query.after.is_none_or(|t| m.timestamp > t)
                    && query.from.as_ref().is_none_or(|f| &m.from == f)
                    && query.direction.is_none_or(|d| match d {
                        Direction::Inbound => !m.from_me,
                        Direction::Outbound => m.from_me,
                    })
                    && needle
                        .as_ref()
                        .is_none_or(|n| m.text.to_lowercase().contains(n))
            })
            .collect();

        // Keep the most recent `limit` matches, preserving log order.
        if matched.len() > limit {
            matched.drain(..matched.len() - limit);
        }
        matched.into_iter().cloned().collect()
    }

    /// Full snapshot of a session's log, oldest first. Used for index
    /// rebuilds and by the flush path.
    pub async fn snapshot(&self, session_id: &str) -> Vec<ChatMessage> {
        match self.logs.get(session_id).map(|e| Arc::clone(e.value())) {
            Some(log) => log.lock().await.messages.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Number of messages currently held for a session.
    pub async fn len(&self, session_id: &str) -> usize {
        match self.logs.get(session_id).map(|e| Arc::clone(e.value())) {
            Some(log) => log.lock().await.messages.len(),
            None => 0,
        }
    }

    /// Drops a session's log entirely (teardown).
    ///
    /// A flush already scheduled for the session still completes with the
    /// snapshot it captures at fire time.
    pub fn remove_session(&self, session_id: &str) {
        self.logs.remove(session_id);
    }

    fn log_handle(&self, session_id: &str) -> Arc<Mutex<SessionLog>> {
        Arc::clone(
            self.logs
                .entry(session_id.to_string())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(SessionLog {
                        messages: VecDeque::new(),
                        flush_scheduled: false,
                    }))
                })
                .value(),
        )
    }

    /// Schedules a debounced flush for a session unless one is pending.
    ///
    /// The timer is intentionally not reset by later writes; a burst of
    /// appends coalesces into the single flush already scheduled.
    fn schedule_flush(
        &self,
        session_id: &str,
        log: &Arc<Mutex<SessionLog>>,
        guard: &mut SessionLog,
    ) {
        if guard.flush_scheduled {
            return;
        }
        guard.flush_scheduled = true;

        let log = Arc::clone(log);
        let sink = Arc::clone(&self.sink);
        let session_id = session_id.to_string();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let snapshot: Vec<ChatMessage> = {
                let mut guard = log.lock().await;
                guard.flush_scheduled = false;
                guard.messages.iter().cloned().collect()
            };
            debug!(
                session_id = session_id.as_str(),
                count = snapshot.len(),
                "flushing message log"
            );
            if let Err(e) = sink.flush(&session_id, &snapshot).await {
                // Best effort: the next write schedules a fresh flush.
                warn!(
                    session_id = session_id.as_str(),
                    error = %e,
                    "message log flush failed"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use waxwing_core::WaxwingError;

    struct CountingSink {
        flushes: AtomicUsize,
        last_len: AtomicUsize,
    }

    impl CountingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                flushes: AtomicUsize::new(0),
                last_len: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FlushSink for CountingSink {
        async fn flush(
            &self,
            _session_id: &str,
            messages: &[ChatMessage],
        ) -> Result<(), WaxwingError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            self.last_len.store(messages.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    fn msg(id: u32, ts: i64) -> ChatMessage {
        ChatMessage {
            id: format!("m{id}"),
            from: "alice".into(),
            to: None,
            text: format!("message {id}"),
            timestamp: ts,
            from_me: false,
            media_type: None,
            status: None,
        }
    }

    fn store(capacity: usize, debounce_ms: u64) -> (MessageStore, Arc<CountingSink>) {
        let sink = CountingSink::new();
        let config = StoreConfig {
            log_capacity: capacity,
            flush_debounce_ms: debounce_ms,
            query_limit: 100,
        };
        (MessageStore::new(&config, sink.clone()), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_oldest_first() {
        let (store, _sink) = store(5_000, 1_000);
        for i in 0..5_001u32 {
            store.append("s1", msg(i, i as i64)).await;
        }
        assert_eq!(store.len("s1").await, 5_000);
        let snapshot = store.snapshot("s1").await;
        assert_eq!(snapshot.first().unwrap().id, "m1", "m0 should be evicted");
        assert_eq!(snapshot.last().unwrap().id, "m5000");
    }

    #[tokio::test(start_paused = true)]
    async fn query_respects_limit_and_order() {
        let (store, _sink) = store(100, 1_000);
        for i in 0..30u32 {
            store.append("s1", msg(i, i as i64)).await;
        }
        let results = store
            .query("s1", &MessageQuery { limit: Some(10), ..Default::default() })
            .await;
        assert_eq!(results.len(), 10);
        // Most recent ten, ascending timestamps.
        assert_eq!(results.first().unwrap().id, "m20");
        assert_eq!(results.last().unwrap().id, "m29");
        assert!(results.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test(start_paused = true)]
    async fn query_filters_compose() {
        let (store, _sink) = store(100, 1_000);
        for i in 0..10u32 {
            let mut m = msg(i, i as i64);
            m.from_me = i % 2 == 0;
            m.from = if i < 5 { "alice".into() } else { "bob".into() };
            store.append("s1", m).await;
        }
        let results = store
            .query(
                "s1",
                &MessageQuery {
                    direction: Some(Direction::Outbound),
                    from: Some("bob".into()),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(results.len(), 2); // m6, m8
        assert!(results.iter().all(|m| m.from_me && m.from == "bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn query_before_after_are_strict() {
        let (store, _sink) = store(100, 1_000);
        for i in 0..10u32 {
            store.append("s1", msg(i, i as i64)).await;
        }
        let results = store
            .query(
                "s1",
                &MessageQuery {
                    after: Some(2),
                    before: Some(6),
                    ..Default::default()
                },
            )
            .await;
        let ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m4", "m5"]);
    }

    #[tokio::test(start_paused = true)]
    async fn query_text_search_is_case_insensitive() {
        let (store, _sink) = store(100, 1_000);
        let mut m = msg(0, 0);
        m.text = "Deploy finished OK".into();
        store.append("s1", m).await;
        store.append("s1", msg(1, 1)).await;

        let results = store
            .query(
                "s1",
                &MessageQuery {
                    search: Some("deploy".into()),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "m0");
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_appends_coalesces_into_one_flush() {
        let (store, sink) = store(100, 1_000);
        for i in 0..50u32 {
            store.append("s1", msg(i, i as i64)).await;
        }
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1_001)).await;
        tokio::task::yield_now().await;

        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(sink.last_len.load(Ordering::SeqCst), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_timer_is_not_reset_by_new_appends() {
        let (store, sink) = store(100, 1_000);
        store.append("s1", msg(0, 0)).await;

        tokio::time::sleep(Duration::from_millis(900)).await;
        store.append("s1", msg(1, 1)).await;

        // 900ms + 101ms passes the original deadline even though the
        // second append was only 101ms ago.
        tokio::time::sleep(Duration::from_millis(101)).await;
        tokio::task::yield_now().await;

        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(sink.last_len.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_after_flush_schedule_again() {
        let (store, sink) = store(100, 1_000);
        store.append("s1", msg(0, 0)).await;
        tokio::time::sleep(Duration::from_millis(1_001)).await;
        tokio::task::yield_now().await;
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);

        store.append("s1", msg(1, 1)).await;
        tokio::time::sleep(Duration::from_millis(1_001)).await;
        tokio::task::yield_now().await;
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn update_status_mutates_only_status() {
        let (store, sink) = store(100, 1_000);
        store.append("s1", msg(0, 0)).await;
        store.update_status("s1", "m0", "read").await;

        let snapshot = store.snapshot("s1").await;
        assert_eq!(snapshot[0].status.as_deref(), Some("read"));
        assert_eq!(snapshot[0].text, "message 0");

        // Unknown message id is a silent no-op.
        store.update_status("s1", "missing", "read").await;
        store.update_status("nosession", "m0", "read").await;

        tokio::time::sleep(Duration::from_millis(1_001)).await;
        tokio::task::yield_now().await;
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_session_drops_log() {
        let (store, _sink) = store(100, 1_000);
        store.append("s1", msg(0, 0)).await;
        store.remove_session("s1");
        assert_eq!(store.len("s1").await, 0);
        assert!(store.query("s1", &MessageQuery::default()).await.is_empty());
    }
}
