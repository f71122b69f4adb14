//! End-to-end optimistic replays.

use ccreplay_core::occ::passes_validation;
use ccreplay_core::samples::occ_demo;
use ccreplay_core::{
    CoreError, DataItem, OccConfig, OccDriver, OccTransaction, OutcomeStatus, Query, Timestamp,
};
use ccreplay_storage::ValueStore;
use ccreplay_testkit::prelude::*;
use std::collections::BTreeSet;

fn set(items: &[&str]) -> BTreeSet<DataItem> {
    items.iter().map(|&i| DataItem::from(i)).collect()
}

#[test]
fn validation_boundaries_pass() {
    let ts = Timestamp::new;
    // Equal starts.
    assert!(passes_validation(ts(4), &set(&["A"]), ts(10), ts(4), ts(6), &set(&["A"])));
    // Start equal to the other's end.
    assert!(passes_validation(ts(6), &set(&["A"]), ts(10), ts(4), ts(6), &set(&["A"])));
    // One tick earlier the overlap on A fails.
    assert!(!passes_validation(ts(5), &set(&["A"]), ts(10), ts(4), ts(6), &set(&["A"])));
}

#[test]
fn demo_scenario_commits_both_transactions() {
    let (transactions, schedule) = occ_demo();
    let outcome = OccDriver::new(transactions, schedule, OccConfig::default())
        .unwrap()
        .run()
        .unwrap();

    assert!(outcome.tokens().iter().all(|t| is_occ_token(t)));
    assert!(outcome.tokens().contains(&"RB2->9".to_string()));
    let second = outcome.transaction(2).unwrap();
    assert_eq!(second.rollbacks, 1);
    assert_eq!(
        second.status,
        OutcomeStatus::Committed {
            end_timestamp: Timestamp::new(20)
        }
    );
}

#[test]
fn relabels_are_monotonic_in_demo() {
    let (transactions, schedule) = occ_demo();
    let mut driver = OccDriver::new(transactions, schedule, OccConfig::default()).unwrap();
    assert_eq!(step_checking_relabels(&mut driver), 1);
}

#[test]
fn counter_transfer_is_applied_once_per_commit() {
    let transfer = |id| {
        OccTransaction::new(
            id,
            vec![
                Query::read("A"),
                Query::read("B"),
                Query::function(["A", "B"], |v| v[0] + v[1]),
                Query::write("A"),
                Query::display(["A", "B"]),
            ],
        )
    };
    let mut store = TempStore::new();
    store.write("A", 1).unwrap();
    store.write("B", 10).unwrap();

    let outcome = OccDriver::new(
        vec![transfer(1), transfer(2)],
        vec![1, 2, 1, 2, 1, 2, 1, 2, 1, 2],
        OccConfig::default(),
    )
    .unwrap()
    .run_with_store(&mut *store)
    .unwrap();

    assert!(outcome.transactions.iter().all(|t| t.is_committed()));
    assert_eq!(outcome.transaction(1).unwrap().displays, ["11 10"]);
    assert_eq!(outcome.transaction(2).unwrap().displays, ["21 10"]);
    assert_eq!(store.read("A").unwrap(), 21);
}

#[test]
fn retry_bound_stops_the_replay() {
    let (transactions, schedule) = occ_demo();
    let err = OccDriver::new(transactions, schedule, OccConfig::new().max_rollbacks(0))
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, CoreError::RetryLimitExceeded { id: 2, limit: 0 }));
}
