// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session pub/sub fan-out.
//!
//! Each session id is a topic. Subscribers hold the receiving half of a
//! bounded mpsc channel; [`RealtimeBroadcaster::publish`] delivers an
//! event to every current subscriber of that session only. Delivery is
//! best-effort and at-most-once per subscriber: a full or closed channel
//! is never an error for the publisher, and closed subscribers are
//! pruned lazily on the next publish.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

/// Per-subscriber channel depth. A subscriber that falls this far behind
/// starts losing events rather than slowing the pipeline.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

/// An event delivered to session subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastEvent {
    /// Event name (`message`, `state`, `message_status`, ...).
    pub event: String,
    /// JSON payload.
    pub payload: serde_json::Value,
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<BroadcastEvent>,
}

/// A live subscription to one session's events.
///
/// Dropping the subscription (or just its receiver) closes the channel;
/// the broadcaster notices on the next publish and removes the entry.
/// Explicit [`RealtimeBroadcaster::unsubscribe`] removes it immediately
/// and is safe to call any number of times.
pub struct Subscription {
    session_id: String,
    id: u64,
    /// Ordered stream of events for the subscribed session.
    pub receiver: mpsc::Receiver<BroadcastEvent>,
}

impl Subscription {
    /// The session this subscription listens to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Identifier to pass to [`RealtimeBroadcaster::unsubscribe`].
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Fan-out registry for all sessions.
///
/// Constructed once at process start; the subscriber map is owned
/// exclusively by this component.
#[derive(Default)]
pub struct RealtimeBroadcaster {
    next_id: AtomicU64,
    sessions: DashMap<String, Vec<Subscriber>>,
}

impl RealtimeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new listener for a session.
    pub fn subscribe(&self, session_id: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, receiver) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        debug!(session_id, subscriber_id = id, "subscriber added");
        Subscription {
            session_id: session_id.to_string(),
            id,
            receiver,
        }
    }

    /// Removes a listener. Safe to call repeatedly and after the
    /// subscription has already been dropped.
    pub fn unsubscribe(&self, session_id: &str, subscriber_id: u64) {
        if let Some(mut subscribers) = self.sessions.get_mut(session_id) {
            subscribers.retain(|s| s.id != subscriber_id);
        }
        self.sessions
            .remove_if(session_id, |_, subscribers| subscribers.is_empty());
    }

    /// Delivers an event to every current subscriber of a session.
    ///
    /// Best-effort: a subscriber whose channel is full simply misses
    /// this event; a subscriber whose channel is closed is removed.
    /// Publishing to a session with no subscribers is a no-op.
    pub fn publish(&self, session_id: &str, event: &str, payload: serde_json::Value) {
        let Some(mut subscribers) = self.sessions.get_mut(session_id) else {
            return;
        };
        let broadcast = BroadcastEvent {
            event: event.to_string(),
            payload,
        };
        subscribers.retain(|s| match s.tx.try_send(broadcast.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(
                    session_id,
                    subscriber_id = s.id,
                    "subscriber lagging, event dropped"
                );
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(session_id, subscriber_id = s.id, "subscriber gone, pruned");
                false
            }
        });
    }

    /// Number of live subscribers registered for a session.
    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.sessions
            .get(session_id)
            .map_or(0, |subscribers| subscribers.len())
    }
}
