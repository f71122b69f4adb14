//! Lock table state.

use crate::types::{DataItem, TxnId};
use std::collections::BTreeMap;
use std::fmt;

/// Lock modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Read lock, co-holdable by several transactions.
    Shared,
    /// Write lock, held by exactly one transaction.
    Exclusive,
}

impl LockMode {
    /// Rank of the mode: `Shared` < `Exclusive`.
    #[must_use]
    pub const fn strength(self) -> u8 {
        match self {
            Self::Shared => 1,
            Self::Exclusive => 2,
        }
    }

    /// Returns true if holding `self` already permits an operation that
    /// needs `requested`.
    #[must_use]
    pub const fn covers(self, requested: LockMode) -> bool {
        self.strength() >= requested.strength()
    }

    /// Returns true if two different transactions may hold `self` and
    /// `other` on the same item at once.
    #[must_use]
    pub const fn is_compatible_with(self, other: LockMode) -> bool {
        matches!((self, other), (Self::Shared, Self::Shared))
    }

    /// Single-letter code used in trace tokens (`S` or `X`).
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Shared => 'S',
            Self::Exclusive => 'X',
        }
    }
}

/// A lock held by one transaction on one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Locked item.
    pub item: DataItem,
    /// Granted mode.
    pub mode: LockMode,
}

/// Per-item lock state.
#[derive(Debug, Clone)]
struct ItemLock {
    mode: LockMode,
    /// Holders in the order their grants were made.
    holders: Vec<TxnId>,
}

/// Tracks item locks and per-transaction grants.
///
/// # Invariants
///
/// - An item has an entry iff at least one transaction holds a grant on it
/// - An item with several holders is held `Shared` by all of them
/// - Each transaction's grants are kept in the order they were made
///
/// A fresh table belongs to exactly one driver; tables are never shared
/// between runs.
#[derive(Debug, Default)]
pub struct LockTable {
    items: BTreeMap<DataItem, ItemLock>,
    grants: BTreeMap<TxnId, Vec<Grant>>,
}

impl LockTable {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `mode` on `item` to `txn`.
    ///
    /// The grant is unconditional; callers check eligibility first.
    pub fn acquire(&mut self, txn: TxnId, item: &DataItem, mode: LockMode) {
        let entry = self.items.entry(item.clone()).or_insert_with(|| ItemLock {
            mode,
            holders: Vec::new(),
        });
        entry.mode = mode;
        if !entry.holders.contains(&txn) {
            entry.holders.push(txn);
        }
        self.set_grant(txn, item, mode);
    }

    /// Replaces the mode of `txn`'s grant on `item` and of the item itself.
    pub fn upgrade(&mut self, txn: TxnId, item: &DataItem, mode: LockMode) {
        if let Some(entry) = self.items.get_mut(item) {
            entry.mode = mode;
        }
        self.set_grant(txn, item, mode);
    }

    /// Releases every grant held by `txn`.
    ///
    /// Returns the released items in the order they were granted.
    pub fn release(&mut self, txn: TxnId) -> Vec<DataItem> {
        let Some(grants) = self.grants.remove(&txn) else {
            return Vec::new();
        };

        let mut released = Vec::with_capacity(grants.len());
        for grant in grants {
            if let Some(entry) = self.items.get_mut(&grant.item) {
                entry.holders.retain(|&h| h != txn);
                if entry.holders.is_empty() {
                    self.items.remove(&grant.item);
                }
            }
            released.push(grant.item);
        }
        released
    }

    /// Returns true if any transaction holds `item`.
    #[must_use]
    pub fn is_locked(&self, item: &DataItem) -> bool {
        self.items.contains_key(item)
    }

    /// Returns the holders of `item` in grant order.
    #[must_use]
    pub fn holder_ids(&self, item: &DataItem) -> Vec<TxnId> {
        self.items
            .get(item)
            .map(|entry| entry.holders.clone())
            .unwrap_or_default()
    }

    /// Returns true if more than one transaction holds `item`.
    #[must_use]
    pub fn is_shared(&self, item: &DataItem) -> bool {
        self.items
            .get(item)
            .is_some_and(|entry| entry.holders.len() > 1)
    }

    /// Returns the current mode of `item`, if locked.
    #[must_use]
    pub fn mode_of(&self, item: &DataItem) -> Option<LockMode> {
        self.items.get(item).map(|entry| entry.mode)
    }

    /// Returns the mode granted to `txn` on `item`, if any.
    #[must_use]
    pub fn grant_mode(&self, txn: TxnId, item: &DataItem) -> Option<LockMode> {
        self.grants
            .get(&txn)?
            .iter()
            .find(|g| &g.item == item)
            .map(|g| g.mode)
    }

    /// Returns true if `txn` holds at least one grant.
    #[must_use]
    pub fn holds_any(&self, txn: TxnId) -> bool {
        self.grants.get(&txn).is_some_and(|g| !g.is_empty())
    }

    /// Returns the grants of `txn` in grant order.
    #[must_use]
    pub fn grants_of(&self, txn: TxnId) -> &[Grant] {
        self.grants.get(&txn).map_or(&[], Vec::as_slice)
    }

    /// Returns true if no lock is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks the table invariants.
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (item, entry) in &self.items {
            if entry.holders.is_empty() {
                return Err(format!("{item} has an entry but no holders"));
            }
            if entry.holders.len() > 1 && entry.mode != LockMode::Shared {
                return Err(format!("{item} is co-held in {:?} mode", entry.mode));
            }
            for &holder in &entry.holders {
                match self.grant_mode(holder, item) {
                    None => return Err(format!("{item} lists {holder} without a grant")),
                    Some(mode) if entry.holders.len() > 1 && mode != LockMode::Shared => {
                        return Err(format!("{holder} holds {item} {mode:?} alongside others"))
                    }
                    Some(_) => {}
                }
            }
        }
        for (txn, grants) in &self.grants {
            for grant in grants {
                let listed = self
                    .items
                    .get(&grant.item)
                    .is_some_and(|entry| entry.holders.contains(txn));
                if !listed {
                    return Err(format!("grant of {} to {txn} has no item entry", grant.item));
                }
            }
        }
        Ok(())
    }

    fn set_grant(&mut self, txn: TxnId, item: &DataItem, mode: LockMode) {
        let grants = self.grants.entry(txn).or_default();
        match grants.iter_mut().find(|g| &g.item == item) {
            Some(grant) => grant.mode = mode,
            None => grants.push(Grant {
                item: item.clone(),
                mode,
            }),
        }
    }
}

impl fmt::Display for LockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for (txn, grants) in &self.grants {
            for grant in grants {
                if !first {
                    f.write_str(", ")?;
                }
                first = false;
                write!(f, "{}L{txn}({})", grant.mode.code(), grant.item)?;
            }
        }
        f.write_str("}")
    }
}
