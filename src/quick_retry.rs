//! Quick-Retry Queue
//!
//! Session-local re-presentation of recent misses. Every miss appends
//! `{item, mode, available_at = now + delay}`; each turn the engine takes the
//! oldest ready entry before running the full pipeline. Memory only: losing
//! the queue on restart is acceptable.

use std::collections::VecDeque;

use crate::types::Mode;

/// Default delay before a missed item comes back (2 minutes)
pub const QUICK_RETRY_DELAY_MS: i64 = 2 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickRetryEntry {
    pub item_id: String,
    pub mode: Mode,
    pub available_at: i64,
}

#[derive(Debug, Clone)]
pub struct QuickRetryQueue {
    entries: VecDeque<QuickRetryEntry>,
    delay_ms: i64,
}

impl Default for QuickRetryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl QuickRetryQueue {
    pub fn new() -> Self {
        Self::with_delay(QUICK_RETRY_DELAY_MS)
    }

    pub fn with_delay(delay_ms: i64) -> Self {
        Self {
            entries: VecDeque::new(),
            delay_ms: delay_ms.max(0),
        }
    }

    pub fn enqueue(&mut self, item_id: impl Into<String>, mode: Mode, now: i64) {
        self.entries.push_back(QuickRetryEntry {
            item_id: item_id.into(),
            mode,
            available_at: now + self.delay_ms,
        });
    }

    /// Remove and return the oldest entry whose time has come.
    pub fn take_ready(&mut self, now: i64) -> Option<QuickRetryEntry> {
        let idx = self.entries.iter().position(|e| e.available_at <= now)?;
        self.entries.remove(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuickRetryEntry> {
        self.entries.iter()
    }
}
