//! Event log: the causally ordered record of a simulation run.
//!
//! # Invariants
//! - Entries are only appended, except for the truncate-and-splice done by must-fail rollback.
//! - Every entry carries the slot at which it was appended.

use std::fmt;
use crate::core::address::Address;
use crate::core::ledger::{LedgerFailure, TxRecord};
use crate::core::slot::Slot;
use crate::core::value::Value;

/// Why a step of the simulation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// Coin selection could not cover `requested` from `owner`'s outputs.
    NotEnoughFunds { owner: Address, requested: Value },
    /// The ledger rules rejected a submitted transaction.
    Ledger(LedgerFailure),
    /// A must-fail action completed without any failure.
    ExpectedFailureDidNotOccur(String),
    BalanceMismatch { address: Address, expected: Value, observed: Value },
    /// Free-form failure raised by test code.
    Error(String),
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::NotEnoughFunds { owner, requested } => {
                write!(f, "Not enough funds at {}: requested {}", owner, requested)
            }
            FailReason::Ledger(failure) => write!(f, "Ledger rejected transaction: {}", failure),
            FailReason::ExpectedFailureDidNotOccur(msg) => write!(f, "Expected failure did not occur: {}", msg),
            FailReason::BalanceMismatch { address, expected, observed } => write!(
                f,
                "Balance mismatch at {}: expected {}, observed {}",
                address, expected, observed
            ),
            FailReason::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Submitted(TxRecord),
    Failure(FailReason),
    Info(String),
    /// An entry produced inside a must-fail action that was rolled back.
    ExpectedFailure { name: String, entry: Box<LogEntry> },
}

impl LogEntry {
    pub fn is_failure(&self) -> bool {
        matches!(self, LogEntry::Failure(_))
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Submitted(record) => write!(f, "Submitted tx {} ({})", record.tx_id, record.tx),
            LogEntry::Failure(reason) => write!(f, "{}", reason),
            LogEntry::Info(msg) => write!(f, "{}", msg),
            LogEntry::ExpectedFailure { name, entry } => write!(f, "Expected failure [{}]: {}", name, entry),
        }
    }
}

/// Ordered `(slot, entry)` sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    entries: Vec<(Slot, LogEntry)>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slot: Slot, entry: LogEntry) {
        self.entries.push((slot, entry));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Slot, LogEntry)] {
        &self.entries
    }

    /// Failures in log order. Relabelled expected failures are not counted.
    pub fn failures(&self) -> impl Iterator<Item = (Slot, &FailReason)> {
        self.entries.iter().filter_map(|(slot, entry)| match entry {
            LogEntry::Failure(reason) => Some((*slot, reason)),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn submitted(&self) -> impl Iterator<Item = &TxRecord> {
        self.entries.iter().filter_map(|(_, entry)| match entry {
            LogEntry::Submitted(record) => Some(record),
            _ => None,
        })
    }

    /// Removes and returns every entry past the first `len`.
    pub(crate) fn split_off(&mut self, len: usize) -> Vec<(Slot, LogEntry)> {
        self.entries.split_off(len.min(self.entries.len()))
    }

    pub(crate) fn extend(&mut self, entries: impl IntoIterator<Item = (Slot, LogEntry)>) {
        self.entries.extend(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_count_ignores_other_entries() {
        let mut log = EventLog::new();
        log.push(0, LogEntry::Info("hello".into()));
        log.push(1, LogEntry::Failure(FailReason::Error("boom".into())));
        log.push(
            2,
            LogEntry::ExpectedFailure {
                name: "x".into(),
                entry: Box::new(LogEntry::Failure(FailReason::Error("hidden".into()))),
            },
        );
        assert_eq!(log.len(), 3);
        assert_eq!(log.failure_count(), 1);
        assert_eq!(log.failures().next().map(|(slot, _)| slot), Some(1));
    }

    #[test]
    fn test_split_off_and_extend() {
        let mut log = EventLog::new();
        log.push(0, LogEntry::Info("a".into()));
        log.push(0, LogEntry::Info("b".into()));
        log.push(3, LogEntry::Info("c".into()));
        let tail = log.split_off(1);
        assert_eq!(log.len(), 1);
        assert_eq!(tail.len(), 2);
        log.extend(tail);
        assert_eq!(log.len(), 3);
        assert!(log.split_off(10).is_empty());
    }

    #[test]
    fn test_display() {
        let entry = LogEntry::ExpectedFailure {
            name: "guard".into(),
            entry: Box::new(LogEntry::Failure(FailReason::ExpectedFailureDidNotOccur("oops".into()))),
        };
        assert_eq!(entry.to_string(), "Expected failure [guard]: Expected failure did not occur: oops");
    }
}
