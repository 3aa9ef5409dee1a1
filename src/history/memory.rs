//! In-process history store backed by a mutex-guarded ring of entries.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{HistoryEntry, HistoryStore, DEFAULT_MAX_HISTORY};
use crate::calc::Operation;

/// State guarded by the ledger lock. The id counter lives next to the
/// entries so that allocation and append happen under one acquisition.
struct LedgerInner {
    /// Oldest first.
    entries: VecDeque<HistoryEntry>,
    next_id: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Bounded, thread-safe, in-memory history.
///
/// Holds at most `max_history` entries; recording past capacity evicts the
/// oldest entries in one batch. Reads return owned copies, so a snapshot is
/// never affected by later `record` or `clear` calls.
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
    max_history: usize,
}

impl MemoryLedger {
    /// Create a ledger retaining at most `max_history` entries.
    ///
    /// `0` is not a usable bound and falls back to [`DEFAULT_MAX_HISTORY`].
    pub fn new(max_history: usize) -> Self {
        let max_history = if max_history == 0 {
            warn!(
                default = DEFAULT_MAX_HISTORY,
                "max_history must be positive, keeping default"
            );
            DEFAULT_MAX_HISTORY
        } else {
            max_history
        };

        Self {
            inner: Mutex::new(LedgerInner {
                entries: VecDeque::new(),
                next_id: 0,
                last_timestamp: None,
            }),
            max_history,
        }
    }

    // Every mutation below leaves `LedgerInner` consistent before anything
    // that could panic, so a poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryStore for MemoryLedger {
    fn record(
        &self,
        operator: Operation,
        operand_a: f64,
        operand_b: f64,
        result: f64,
        error_message: Option<String>,
    ) -> HistoryEntry {
        let mut inner = self.lock();

        // Wall clock may step backwards; keep timestamps ordered with ids.
        let now = Utc::now();
        let timestamp = match inner.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let entry = HistoryEntry {
            id: inner.next_id,
            timestamp,
            operator,
            operand_a,
            operand_b,
            result,
            error_message,
        };
        inner.next_id += 1;
        inner.last_timestamp = Some(timestamp);
        inner.entries.push_back(entry.clone());

        if inner.entries.len() > self.max_history {
            let excess = inner.entries.len() - self.max_history;
            inner.entries.drain(..excess);
            debug!(evicted = excess, retained = self.max_history, "trimmed history");
        }

        entry
    }

    fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let inner = self.lock();
        let len = inner.entries.len();
        let take = if limit == 0 { len } else { limit.min(len) };

        inner.entries.iter().rev().take(take).cloned().collect()
    }

    fn clear(&self) {
        let mut inner = self.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        debug!(dropped, next_id = inner.next_id, "cleared history");
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn max_history(&self) -> usize {
        self.max_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record_add(ledger: &MemoryLedger, a: f64, b: f64) -> HistoryEntry {
        ledger.record(Operation::Add, a, b, a + b, None)
    }

    fn ids(entries: &[HistoryEntry]) -> Vec<u64> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_zero_capacity_keeps_default() {
        let ledger = MemoryLedger::new(0);
        assert_eq!(ledger.max_history(), DEFAULT_MAX_HISTORY);
        assert_eq!(MemoryLedger::default().max_history(), DEFAULT_MAX_HISTORY);
    }

    #[test]
    fn test_history_is_newest_first() {
        let ledger = MemoryLedger::new(10);
        for i in 0..5 {
            record_add(&ledger, i as f64, 1.0);
        }

        let all = ledger.history(5);
        assert_eq!(ids(&all), vec![4, 3, 2, 1, 0]);

        let recent = ledger.history(2);
        assert_eq!(ids(&recent), vec![4, 3]);
    }

    #[test]
    fn test_zero_or_oversized_limit_returns_everything() {
        let ledger = MemoryLedger::new(10);
        for i in 0..3 {
            record_add(&ledger, i as f64, 0.0);
        }

        assert_eq!(ledger.history(0).len(), 3);
        assert_eq!(ledger.history(100).len(), 3);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let ledger = MemoryLedger::new(3);
        for i in 0..5 {
            record_add(&ledger, i as f64, 0.0);
        }

        assert_eq!(ledger.len(), 3);
        assert_eq!(ids(&ledger.history(0)), vec![4, 3, 2]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let ledger = MemoryLedger::new(10);
        record_add(&ledger, 1.0, 2.0);

        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.history(0).is_empty());

        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.history(0).is_empty());
    }

    #[test]
    fn test_ids_continue_after_clear() {
        let ledger = MemoryLedger::new(10);
        record_add(&ledger, 1.0, 1.0);
        record_add(&ledger, 2.0, 2.0);
        ledger.clear();

        let entry = record_add(&ledger, 3.0, 3.0);
        assert_eq!(entry.id, 2);
    }

    #[test]
    fn test_snapshot_is_independent_of_later_mutation() {
        let ledger = MemoryLedger::new(2);
        record_add(&ledger, 1.0, 1.0);
        record_add(&ledger, 2.0, 2.0);

        let snapshot = ledger.history(0);
        record_add(&ledger, 3.0, 3.0);
        ledger.clear();

        assert_eq!(ids(&snapshot), vec![1, 0]);
        assert_eq!(snapshot[0].operand_a, 2.0);
    }

    #[test]
    fn test_timestamps_follow_id_order() {
        let ledger = MemoryLedger::new(100);
        for i in 0..50 {
            record_add(&ledger, i as f64, 0.0);
        }

        let entries = ledger.history(0);
        for pair in entries.windows(2) {
            // newest first
            assert!(pair[0].id > pair[1].id);
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn test_failed_division_entry() {
        let ledger = MemoryLedger::new(10);
        ledger.record(
            Operation::Divide,
            5.0,
            0.0,
            0.0,
            Some("division by zero is not allowed".to_string()),
        );

        let got = ledger.history(1);
        assert_eq!(got.len(), 1);
        let entry = &got[0];
        assert_eq!(entry.operator, Operation::Divide);
        assert_eq!(entry.operand_a, 5.0);
        assert_eq!(entry.operand_b, 0.0);
        assert_eq!(entry.result, 0.0);
        assert!(entry
            .error_message
            .as_deref()
            .unwrap()
            .contains("division by zero"));
    }

    #[test]
    fn test_three_adds_limit_two() {
        let ledger = MemoryLedger::new(10);
        record_add(&ledger, 1.0, 2.0);
        record_add(&ledger, 2.0, 3.0);
        record_add(&ledger, 3.0, 4.0);

        let got: Vec<(f64, f64, f64)> = ledger
            .history(2)
            .iter()
            .map(|e| (e.operand_a, e.operand_b, e.result))
            .collect();
        assert_eq!(got, vec![(3.0, 4.0, 7.0), (2.0, 3.0, 5.0)]);
    }

    #[test]
    fn test_concurrent_records_are_gap_free() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let ledger = MemoryLedger::new(THREADS * PER_THREAD);

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let ledger = &ledger;
                s.spawn(move || {
                    for k in 0..PER_THREAD {
                        record_add(ledger, t as f64, k as f64);
                    }
                });
            }
        });

        let entries = ledger.history(0);
        assert_eq!(entries.len(), THREADS * PER_THREAD);

        let mut got_ids = ids(&entries);
        got_ids.reverse();
        let want_ids: Vec<u64> = (0..(THREADS * PER_THREAD) as u64).collect();
        assert_eq!(got_ids, want_ids);

        let operands: HashSet<(usize, usize)> = entries
            .iter()
            .map(|e| (e.operand_a as usize, e.operand_b as usize))
            .collect();
        assert_eq!(operands.len(), THREADS * PER_THREAD);
        for t in 0..THREADS {
            for k in 0..PER_THREAD {
                assert!(operands.contains(&(t, k)));
            }
        }
    }

    #[test]
    fn test_concurrent_records_respect_capacity() {
        let ledger = MemoryLedger::new(16);

        std::thread::scope(|s| {
            for t in 0..4 {
                let ledger = &ledger;
                s.spawn(move || {
                    for k in 0..100 {
                        record_add(ledger, t as f64, k as f64);
                        let _ = ledger.history(5);
                    }
                });
            }
        });

        assert_eq!(ledger.len(), 16);
        let entries = ledger.history(0);
        assert_eq!(entries[0].id, 399);
        assert_eq!(entries[15].id, 384);
    }
}
