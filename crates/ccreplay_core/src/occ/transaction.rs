//! Optimistic transaction state.

use crate::occ::query::Query;
use crate::types::{DataItem, Timestamp, TxnId};
use std::collections::BTreeSet;

/// Lifecycle of an optimistic transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Not ticked yet (or ticked again after a rollback reset it).
    Idle,
    /// Executing operations.
    Active,
    /// Passed validation.
    Committed,
}

/// A transaction replayed under optimistic concurrency control.
///
/// The original id never changes and is how callers recognise the
/// transaction. The start timestamp is its logical label: it orders the
/// transaction for validation and is reassigned on every rollback.
#[derive(Debug, Clone)]
pub struct OccTransaction {
    id: TxnId,
    start: Timestamp,
    end: Timestamp,
    queries: Vec<Query>,
    cursor: usize,
    read_set: BTreeSet<DataItem>,
    write_set: BTreeSet<DataItem>,
    status: TransactionStatus,
    rollbacks: usize,
}

impl OccTransaction {
    /// Creates a transaction whose id is also its initial start timestamp.
    #[must_use]
    pub fn new(id: u64, queries: Vec<Query>) -> Self {
        Self {
            id: TxnId::new(id),
            start: Timestamp::new(id),
            end: Timestamp::INFINITY,
            queries,
            cursor: 0,
            read_set: BTreeSet::new(),
            write_set: BTreeSet::new(),
            status: TransactionStatus::Idle,
            rollbacks: 0,
        }
    }

    /// Returns the original transaction id.
    #[must_use]
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the current start timestamp (logical label).
    #[must_use]
    pub fn start_timestamp(&self) -> Timestamp {
        self.start
    }

    /// Returns the end timestamp, infinite until committed.
    #[must_use]
    pub fn end_timestamp(&self) -> Timestamp {
        self.end
    }

    /// Returns the operations.
    #[must_use]
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns true if the transaction has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Returns the index of the next operation.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the current state.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns how often the transaction was rolled back.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Returns the items read since the last (re)start.
    #[must_use]
    pub fn read_set(&self) -> &BTreeSet<DataItem> {
        &self.read_set
    }

    /// Returns the items written since the last (re)start.
    #[must_use]
    pub fn write_set(&self) -> &BTreeSet<DataItem> {
        &self.write_set
    }

    /// Returns true once every operation has executed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor == self.queries.len()
    }

    /// Executes the next operation, recording reads and writes.
    ///
    /// Returns `None` if nothing is left to execute.
    pub fn execute_next(&mut self) -> Option<&Query> {
        let query = self.queries.get(self.cursor)?;
        match query {
            Query::Read(item) => {
                self.read_set.insert(item.clone());
            }
            Query::Write(item) => {
                self.write_set.insert(item.clone());
            }
            Query::Function { .. } | Query::Display { .. } => {}
        }
        self.status = TransactionStatus::Active;
        self.cursor += 1;
        self.queries.get(self.cursor - 1)
    }

    /// Backward validation of this (finishing) transaction against `other`
    /// at validation time `validation`.
    #[must_use]
    pub fn validates_against(&self, validation: Timestamp, other: &OccTransaction) -> bool {
        passes_validation(
            self.start,
            &self.read_set,
            validation,
            other.start,
            other.end,
            &other.write_set,
        )
    }

    /// Fixes the end timestamp after successful validation.
    pub(crate) fn mark_committed(&mut self, end: Timestamp) {
        self.end = end;
        self.status = TransactionStatus::Committed;
    }

    /// Resets the transaction to run again from scratch under `new_start`.
    pub(crate) fn rollback(&mut self, new_start: Timestamp) {
        self.start = new_start;
        self.end = Timestamp::INFINITY;
        self.cursor = 0;
        self.read_set.clear();
        self.write_set.clear();
        self.status = TransactionStatus::Idle;
        self.rollbacks += 1;
    }
}

/// Pairwise backward validation test.
///
/// A finishing transaction `T` passes against `O` when:
/// - `T` started no later than `O` (T serializes first), or
/// - `O` ended no later than `T` started, or
/// - `O` ended after `T` started but no later than the validation time,
///   and `T` read nothing `O` wrote.
#[must_use]
pub fn passes_validation(
    start: Timestamp,
    read_set: &BTreeSet<DataItem>,
    validation: Timestamp,
    other_start: Timestamp,
    other_end: Timestamp,
    other_write_set: &BTreeSet<DataItem>,
) -> bool {
    if start <= other_start {
        return true;
    }
    if start >= other_end {
        return true;
    }
    validation >= other_end && read_set.is_disjoint(other_write_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> BTreeSet<DataItem> {
        names.iter().map(|&n| DataItem::from(n)).collect()
    }

    fn ts(value: u64) -> Timestamp {
        Timestamp::new(value)
    }

    #[test]
    fn equal_starts_pass() {
        assert!(passes_validation(ts(3), &items(&["A"]), ts(9), ts(3), Timestamp::INFINITY, &items(&["A"])));
    }

    #[test]
    fn start_equal_to_other_end_passes() {
        assert!(passes_validation(ts(5), &items(&["A"]), ts(9), ts(1), ts(5), &items(&["A"])));
    }

    #[test]
    fn overlapping_reads_of_written_items_fail() {
        assert!(!passes_validation(ts(5), &items(&["A"]), ts(9), ts(1), ts(7), &items(&["A"])));
        assert!(passes_validation(ts(5), &items(&["B"]), ts(9), ts(1), ts(7), &items(&["A"])));
    }

    #[test]
    fn unfinished_older_transaction_fails() {
        assert!(!passes_validation(ts(5), &items(&[]), ts(9), ts(1), Timestamp::INFINITY, &items(&[])));
    }

    #[test]
    fn execute_next_records_sets() {
        let mut txn = OccTransaction::new(1, vec![
            Query::read("A"),
            Query::write("B"),
            Query::display(["A"]),
        ]);
        assert_eq!(txn.status(), TransactionStatus::Idle);
        while txn.execute_next().is_some() {}
        assert!(txn.is_finished());
        assert_eq!(txn.read_set(), &items(&["A"]));
        assert_eq!(txn.write_set(), &items(&["B"]));
        assert_eq!(txn.status(), TransactionStatus::Active);
        assert!(txn.execute_next().is_none());
    }

    #[test]
    fn rollback_resets_progress_and_relabels() {
        let mut txn = OccTransaction::new(2, vec![Query::read("A"), Query::write("A")]);
        txn.execute_next();
        txn.rollback(ts(9));
        assert_eq!(txn.id(), TxnId::new(2));
        assert_eq!(txn.start_timestamp(), ts(9));
        assert_eq!(txn.cursor(), 0);
        assert!(txn.read_set().is_empty());
        assert_eq!(txn.rollbacks(), 1);
        assert!(txn.end_timestamp().is_infinite());
    }

    #[test]
    fn commit_fixes_end_timestamp() {
        let mut txn = OccTransaction::new(1, vec![Query::read("A")]);
        txn.execute_next();
        txn.mark_committed(ts(8));
        assert_eq!(txn.end_timestamp(), ts(8));
        assert_eq!(txn.status(), TransactionStatus::Committed);
    }
}
