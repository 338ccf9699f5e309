// SPDX-FileCopyrightText: 2026 Waxwing Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate limiting for the Waxwing session engine.
//!
//! Two independent mechanisms:
//! - [`SendLimiter`]: a lazy-refill token bucket per session gating
//!   outbound sends.
//! - [`CreationLimiter`]: sliding windows (per origin key and global)
//!   gating session-creation requests.
//!
//! Both are process-local and synchronous: a refusal is returned to the
//! caller as data (remaining balance, refusal reason), never as a block
//! or a panic. State is lost on restart; for horizontally scaled
//! deployments the window/bucket state would have to move to a shared
//! store.

pub mod bucket;
pub mod window;

pub use bucket::{SendLimiter, SendVerdict};
pub use window::{CreateRefusal, CreationLimiter};
