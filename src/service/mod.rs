//! Calculator service: executes an operation, records it, returns the outcome.

use tracing::{debug, warn};

use crate::calc::{self, CalcError, Operation};
use crate::history::{HistoryEntry, HistoryStore, MemoryLedger};

/// Operations a caller can invoke on the calculator.
///
/// Every arithmetic call is recorded in history exactly once, whether it
/// succeeds or fails.
pub trait CalculatorService: Send + Sync {
    fn add(&self, a: f64, b: f64) -> f64;
    fn subtract(&self, a: f64, b: f64) -> f64;
    fn multiply(&self, a: f64, b: f64) -> f64;
    fn divide(&self, a: f64, b: f64) -> Result<f64, CalcError>;

    /// Up to `limit` most recent entries, newest first. `0` means all.
    fn history(&self, limit: usize) -> Vec<HistoryEntry>;

    fn clear_history(&self);

    fn calculate(&self, op: Operation, a: f64, b: f64) -> Result<f64, CalcError> {
        match op {
            Operation::Add => Ok(self.add(a, b)),
            Operation::Subtract => Ok(self.subtract(a, b)),
            Operation::Multiply => Ok(self.multiply(a, b)),
            Operation::Divide => self.divide(a, b),
        }
    }
}

/// [`CalculatorService`] over any [`HistoryStore`].
pub struct Calculator<S = MemoryLedger> {
    store: S,
}

impl Calculator<MemoryLedger> {
    /// Calculator with an in-memory ledger of the default size.
    pub fn new() -> Self {
        Self::with_store(MemoryLedger::default())
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self::with_store(MemoryLedger::new(max_history))
    }
}

impl Default for Calculator<MemoryLedger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: HistoryStore> Calculator<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    fn succeeded(&self, op: Operation, a: f64, b: f64, result: f64) -> f64 {
        let entry = self.store.record(op, a, b, result, None);
        debug!(id = entry.id, op = %op, a, b, result, "calculated");
        result
    }

    fn failed(&self, op: Operation, a: f64, b: f64, err: &CalcError) {
        let entry = self.store.record(op, a, b, 0.0, Some(err.to_string()));
        warn!(id = entry.id, op = %op, a, b, error = %err, "calculation failed");
    }
}

impl<S: HistoryStore> CalculatorService for Calculator<S> {
    fn add(&self, a: f64, b: f64) -> f64 {
        self.succeeded(Operation::Add, a, b, calc::add(a, b))
    }

    fn subtract(&self, a: f64, b: f64) -> f64 {
        self.succeeded(Operation::Subtract, a, b, calc::subtract(a, b))
    }

    fn multiply(&self, a: f64, b: f64) -> f64 {
        self.succeeded(Operation::Multiply, a, b, calc::multiply(a, b))
    }

    fn divide(&self, a: f64, b: f64) -> Result<f64, CalcError> {
        match calc::divide(a, b) {
            Ok(result) => Ok(self.succeeded(Operation::Divide, a, b, result)),
            Err(e) => {
                self.failed(Operation::Divide, a, b, &e);
                Err(e)
            }
        }
    }

    fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.store.history(limit)
    }

    fn clear_history(&self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_successful_operations_are_recorded() {
        let svc = Calculator::with_max_history(10);
        assert_eq!(svc.add(2.0, 3.0), 5.0);
        assert_eq!(svc.subtract(2.0, 3.0), -1.0);
        assert_eq!(svc.multiply(3.0, 7.0), 21.0);
        assert_eq!(svc.divide(10.0, 4.0), Ok(2.5));

        let history = svc.history(0);
        let ops: Vec<Operation> = history.iter().map(|e| e.operator).collect();
        assert_eq!(
            ops,
            vec![
                Operation::Divide,
                Operation::Multiply,
                Operation::Subtract,
                Operation::Add
            ]
        );
        assert!(history.iter().all(|e| e.error_message.is_none()));
        assert_eq!(history[0].result, 2.5);
    }

    #[test]
    fn test_division_by_zero_is_recorded_and_returned() {
        let svc = Calculator::with_max_history(10);
        let err = svc.divide(5.0, 0.0).unwrap_err();
        assert_eq!(err, CalcError::DivisionByZero);

        let history = svc.history(0);
        assert_eq!(history.len(), 1);
        let entry = &history[0];
        assert_eq!(entry.operator, Operation::Divide);
        assert_eq!((entry.operand_a, entry.operand_b), (5.0, 0.0));
        assert_eq!(entry.result, 0.0);
        assert_eq!(entry.error_message.as_deref(), Some("division by zero is not allowed"));
    }

    #[test]
    fn test_calculate_records_once() {
        let svc = Calculator::with_max_history(10);
        for op in [
            Operation::Add,
            Operation::Subtract,
            Operation::Multiply,
            Operation::Divide,
        ] {
            let _ = svc.calculate(op, 6.0, 3.0);
        }
        let _ = svc.calculate(Operation::Divide, 1.0, 0.0);

        let ids: Vec<u64> = svc.history(0).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_clear_history() {
        let svc = Calculator::new();
        svc.add(1.0, 1.0);
        svc.clear_history();
        assert!(svc.history(0).is_empty());
        svc.clear_history();
        assert!(svc.history(0).is_empty());
    }

    #[test]
    fn test_usable_as_trait_object_across_threads() {
        let svc: Arc<dyn CalculatorService> = Arc::new(Calculator::with_max_history(1000));

        std::thread::scope(|s| {
            for t in 0..4 {
                let svc = Arc::clone(&svc);
                s.spawn(move || {
                    for k in 0..50 {
                        svc.add(t as f64, k as f64);
                        let _ = svc.divide(t as f64, 0.0);
                    }
                });
            }
        });

        let history = svc.history(0);
        assert_eq!(history.len(), 400);
        assert_eq!(history.iter().filter(|e| e.error_message.is_some()).count(), 200);
    }
}
