// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message storage for the Waxwing session engine.
//!
//! Two components share this crate because they are fed together:
//! - [`MessageStore`]: the bounded, debounce-flushed in-memory log,
//!   the owner of all message records.
//! - [`SearchIndex`]: a derived inverted index over the same records,
//!   rebuildable from a store snapshot at any time.

pub mod log;
pub mod search;

pub use log::{Direction, MessageQuery, MessageStore};
pub use search::{SearchHit, SearchIndex};
