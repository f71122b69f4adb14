//! Built-in sample inputs.

use crate::occ::{OccTransaction, Query};

/// Sample two-phase locking schedules, numbered from 1.
pub const TPL_SAMPLES: [&str; 6] = [
    "R1(X); W2(X); W2(Y); W3(Y); W1(X); C1; C2; C3;",
    "R1(X); R2(Y); R1(Y); W2(Y); W1(X); C1; C2;",
    "R1(X); R2(Y); R1(Y); R2(X); C1; C2;",
    "R1(X) ;W2(Y) ;W2(X); W3(Y) ;W1(Y); C1; C2; C3;",
    "R1(X); R2(X); W2(Y); W3(Y); W1(X); C1; C2; C3",
    "W1(X); W2(Y); W1(Y); W2(X); C1; C2",
];

/// Returns sample schedule `number` (1-based).
#[must_use]
pub fn tpl_sample(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|index| TPL_SAMPLES.get(index))
        .copied()
}

/// Two transactions that both read then write `B` and then `A`, with a
/// schedule that forces the second one to roll back.
#[must_use]
pub fn occ_demo() -> (Vec<OccTransaction>, Vec<u64>) {
    let transaction = |id| {
        OccTransaction::new(
            id,
            vec![
                Query::read("B"),
                Query::write("B"),
                Query::read("A"),
                Query::write("A"),
            ],
        )
    };
    (
        vec![transaction(1), transaction(2)],
        vec![1, 1, 2, 2, 2, 2, 1, 1],
    )
}
