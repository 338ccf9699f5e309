// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory inverted index over per-session message logs.
//!
//! Purely derived state: postings map each token to the set of message
//! ids containing it, and can be rebuilt at any time by replaying the
//! message store. Nothing here is persisted.
//!
//! Scoring: a candidate's score is the number of distinct query tokens
//! it matches, multiplied by a recency factor (x1.5 under one hour old,
//! x1.2 under 24 hours, x1 otherwise). Ties break on newer timestamp.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;

use waxwing_config::SearchConfig;
use waxwing_core::types::ChatMessage;

const MIN_TOKEN_LEN: usize = 2;
const MAX_TOKEN_LEN: usize = 39;

const HOUR_MS: i64 = 60 * 60 * 1_000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// One search result: a message id with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub message_id: String,
    pub score: f64,
    pub timestamp: i64,
}

#[derive(Default)]
struct SessionPostings {
    /// token -> ids of messages containing it
    terms: HashMap<String, HashSet<String>>,
    /// message id -> timestamp, for recency scoring
    timestamps: HashMap<String, i64>,
}

/// Full-text index over message logs, partitioned by session id.
pub struct SearchIndex {
    result_limit: usize,
    sessions: DashMap<String, SessionPostings>,
}

impl SearchIndex {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            result_limit: config.result_limit,
            sessions: DashMap::new(),
        }
    }

    /// Adds a message's tokens to its session's postings.
    ///
    /// The index is additive only; evicted messages are not removed.
    /// Callers that care about drift rebuild via [`rebuild_session`].
    ///
    /// [`rebuild_session`]: SearchIndex::rebuild_session
    pub fn index(&self, session_id: &str, message: &ChatMessage) {
        let tokens = tokenize(&message.text);
        if tokens.is_empty() {
            return;
        }
        let mut postings = self.sessions.entry(session_id.to_string()).or_default();
        for token in tokens {
            postings
                .terms
                .entry(token)
                .or_default()
                .insert(message.id.clone());
        }
        postings
            .timestamps
            .insert(message.id.clone(), message.timestamp);
    }

    /// Searches one session's log. Returns up to `limit` hits sorted by
    /// score descending, then timestamp descending. An empty or
    /// all-discarded query yields no hits.
    pub fn search(&self, session_id: &str, query: &str, limit: Option<usize>) -> Vec<SearchHit> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let Some(postings) = self.sessions.get(session_id) else {
            return Vec::new();
        };

        let mut match_counts: HashMap<&str, u32> = HashMap::new();
        for token in &query_tokens {
            if let Some(ids) = postings.terms.get(token) {
                for id in ids {
                    *match_counts.entry(id.as_str()).or_insert(0) += 1;
                }
            }
        }

        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut hits: Vec<SearchHit> = match_counts
            .into_iter()
            .map(|(id, matched)| {
                let timestamp = postings.timestamps.get(id).copied().unwrap_or(0);
                SearchHit {
                    message_id: id.to_string(),
                    score: f64::from(matched) * recency_multiplier(now_ms, timestamp),
                    timestamp,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.timestamp.cmp(&a.timestamp))
        });
        hits.truncate(limit.unwrap_or(self.result_limit));
        hits
    }

    /// Replaces a session's postings with ones rebuilt from a log snapshot.
    pub fn rebuild_session(&self, session_id: &str, messages: &[ChatMessage]) {
        self.sessions.remove(session_id);
        for message in messages {
            self.index(session_id, message);
        }
    }

    /// Drops a session's postings entirely (teardown).
    pub fn remove_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

fn recency_multiplier(now_ms: i64, timestamp: i64) -> f64 {
    let age = now_ms - timestamp;
    if age < HOUR_MS {
        1.5
    } else if age < DAY_MS {
        1.2
    } else {
        1.0
    }
}

/// Splits text into unique lowercase tokens.
///
/// Diacritics are stripped, non-alphanumeric characters act as
/// separators, and tokens outside 2..=39 characters are discarded.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current = String::new();

    for c in text.chars() {
        let folded = fold_diacritic(c);
        if folded.is_alphanumeric() {
            for lower in folded.to_lowercase() {
                current.push(lower);
            }
        } else if !current.is_empty() {
            push_token(&mut tokens, &mut seen, std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        push_token(&mut tokens, &mut seen, current);
    }
    tokens
}

fn push_token(tokens: &mut Vec<String>, seen: &mut HashSet<String>, token: String) {
    let len = token.chars().count();
    if (MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&len) && seen.insert(token.clone()) {
        tokens.push(token);
    }
}

/// Maps common Latin diacritics onto their base character. Characters
/// outside the table pass through unchanged.
fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        _ => c,
    }
}
