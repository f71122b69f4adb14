//! Property-based test generators using proptest.
//!
//! Schedules are built per transaction first and then interleaved by
//! shuffling, so each transaction's own operations keep their order.

use ccreplay_core::{OccTransaction, Query};
use proptest::prelude::*;

/// Item names used by generated schedules.
pub const ITEMS: [&str; 3] = ["A", "B", "C"];

/// A generated data operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenOp {
    /// Read of `ITEMS[index]`.
    Read(usize),
    /// Write of `ITEMS[index]`.
    Write(usize),
}

impl GenOp {
    fn item(self) -> &'static str {
        match self {
            Self::Read(i) | Self::Write(i) => ITEMS[i],
        }
    }
}

fn gen_op_strategy() -> impl Strategy<Value = GenOp> {
    (any::<bool>(), 0..ITEMS.len())
        .prop_map(|(read, item)| if read { GenOp::Read(item) } else { GenOp::Write(item) })
}

/// Interleaves per-transaction sequences following `order`, a shuffled
/// list holding each transaction index once per element.
fn interleave<T: Clone>(sequences: &[Vec<T>], order: &[usize]) -> Vec<T> {
    let mut cursors = vec![0; sequences.len()];
    order
        .iter()
        .map(|&txn| {
            let item = sequences[txn][cursors[txn]].clone();
            cursors[txn] += 1;
            item
        })
        .collect()
}

fn order_strategy(lengths: Vec<usize>) -> impl Strategy<Value = Vec<usize>> {
    let slots: Vec<usize> = lengths
        .iter()
        .enumerate()
        .flat_map(|(txn, &len)| std::iter::repeat(txn).take(len))
        .collect();
    Just(slots).prop_shuffle()
}

/// Strategy for two-phase locking schedule text.
///
/// Up to four transactions, each with up to four reads and writes
/// followed by its commit.
pub fn tpl_schedule_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::collection::vec(gen_op_strategy(), 0..5), 1..5).prop_flat_map(
        |transactions| {
            let tokens: Vec<Vec<String>> = transactions
                .iter()
                .enumerate()
                .map(|(index, ops)| {
                    let id = index + 1;
                    ops.iter()
                        .map(|op| match op {
                            GenOp::Read(_) => format!("R{id}({})", op.item()),
                            GenOp::Write(_) => format!("W{id}({})", op.item()),
                        })
                        .chain([format!("C{id}")])
                        .collect()
                })
                .collect();
            let lengths = tokens.iter().map(Vec::len).collect();
            order_strategy(lengths).prop_map(move |order| interleave(&tokens, &order).join("; "))
        },
    )
}

/// A generated optimistic replay input.
#[derive(Debug, Clone)]
pub struct OccScenario {
    /// Operations per transaction; transaction `i` has id `i + 1`.
    pub operations: Vec<Vec<GenOp>>,
    /// Tick schedule of original ids.
    pub schedule: Vec<u64>,
}

impl OccScenario {
    /// Builds the engine transactions.
    #[must_use]
    pub fn transactions(&self) -> Vec<OccTransaction> {
        self.operations
            .iter()
            .enumerate()
            .map(|(index, ops)| {
                let queries = ops
                    .iter()
                    .map(|&op| match op {
                        GenOp::Read(_) => Query::read(op.item()),
                        GenOp::Write(_) => Query::write(op.item()),
                    })
                    .collect();
                OccTransaction::new(index as u64 + 1, queries)
            })
            .collect()
    }
}

/// Strategy for optimistic replay inputs whose schedule ticks every
/// operation exactly once.
pub fn occ_scenario_strategy() -> impl Strategy<Value = OccScenario> {
    prop::collection::vec(prop::collection::vec(gen_op_strategy(), 1..5), 1..5).prop_flat_map(
        |operations| {
            let lengths = operations.iter().map(Vec::len).collect();
            order_strategy(lengths).prop_map(move |order| OccScenario {
                operations: operations.clone(),
                schedule: order.into_iter().map(|txn| txn as u64 + 1).collect(),
            })
        },
    )
}
