//! Invocation history: one entry per calculator call, success or failure.

mod memory;

pub use self::memory::MemoryLedger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calc::Operation;

/// Retention bound used when none (or a non-positive one) is configured.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// A record of one calculator invocation.
///
/// Entries are immutable once recorded. `result` is `0.0` when the call
/// failed, in which case `error_message` carries the cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "op")]
    pub operator: Operation,
    #[serde(rename = "a")]
    pub operand_a: f64,
    #[serde(rename = "b")]
    pub operand_b: f64,
    pub result: f64,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Storage backend for invocation history.
///
/// Implementations must serialize `record`, `history` and `clear` against
/// each other: ids are allocated and entries appended as one step, and
/// readers never see a half-trimmed store.
pub trait HistoryStore: Send + Sync {
    /// Append an entry with the next id and the current time, evicting the
    /// oldest entries if the store is over capacity. Returns a copy of the
    /// stored entry.
    fn record(
        &self,
        operator: Operation,
        operand_a: f64,
        operand_b: f64,
        result: f64,
        error_message: Option<String>,
    ) -> HistoryEntry;

    /// Up to `limit` most recent entries, newest first. `0` means all.
    fn history(&self, limit: usize) -> Vec<HistoryEntry>;

    /// Drop every retained entry. Id allocation is not reset.
    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn max_history(&self) -> usize;
}
