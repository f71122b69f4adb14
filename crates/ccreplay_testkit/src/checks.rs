//! Trace and state checks shared by integration tests.

use ccreplay_core::{OccDriver, OccEvent, Timestamp, TplDriver};

fn is_id(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Splits `"<id>(<item>)"` into its parts.
fn split_item(rest: &str) -> Option<(&str, &str)> {
    let open = rest.find('(')?;
    let item = rest[open + 1..].strip_suffix(')')?;
    Some((&rest[..open], item))
}

fn is_id_with_item(rest: &str) -> bool {
    split_item(rest).is_some_and(|(id, item)| is_id(id) && !item.is_empty())
}

/// Returns true if `token` is a two-phase locking trace token.
#[must_use]
pub fn is_tpl_token(token: &str) -> bool {
    for prefix in ["XL", "SL", "XU", "SU", "UL", "RB"] {
        if let Some(rest) = token.strip_prefix(prefix) {
            return is_id_with_item(rest);
        }
    }
    if let Some(rest) = token.strip_prefix('C') {
        return is_id(rest);
    }
    match token.strip_prefix('R').or_else(|| token.strip_prefix('W')) {
        Some(rest) => is_id_with_item(rest),
        None => false,
    }
}

/// Returns true if `token` is an optimistic replay trace token.
#[must_use]
pub fn is_occ_token(token: &str) -> bool {
    if let Some(rest) = token.strip_prefix("RB") {
        return rest
            .split_once("->")
            .is_some_and(|(old, new)| is_id(old) && is_id(new));
    }
    if let Some(rest) = token.strip_prefix('S').or_else(|| token.strip_prefix('C')) {
        return is_id(rest);
    }
    let rest = ['R', 'W', 'F', 'D']
        .iter()
        .find_map(|&prefix| token.strip_prefix(prefix));
    rest.is_some_and(is_id_with_item)
}

/// Steps `driver` to the end, checking the lock table after every step.
///
/// Panics with the failing step on the first violation.
pub fn step_checking_locks(driver: &mut TplDriver) -> usize {
    let mut steps = 0;
    while driver.step() {
        steps += 1;
        if let Err(violation) = driver.lock_table().check_invariants() {
            panic!("lock table invariant broken after step {steps}: {violation}");
        }
    }
    steps
}

/// Steps `driver` to the end, checking every relabel.
///
/// Each new label must exceed every label still in the schedule and
/// every other transaction's label. Returns the number of rollbacks.
pub fn step_checking_relabels(driver: &mut OccDriver) -> usize {
    let mut rollbacks = 0;
    loop {
        let before: Vec<Timestamp> = driver.schedule().collect();
        if !driver.step().expect("replay step") {
            return rollbacks;
        }
        let Some(&OccEvent::RolledBack { id, new_id }) = driver.events().last() else {
            continue;
        };
        rollbacks += 1;
        assert!(new_id > id, "relabel {id} -> {new_id} does not move forward");
        if let Some(&max) = before.iter().max() {
            assert!(new_id > max, "relabel {new_id} not past scheduled label {max}");
        }
        for txn in driver.transactions() {
            if txn.start_timestamp() != new_id {
                assert!(txn.start_timestamp() < new_id, "relabel {new_id} collides");
            }
        }
    }
}
