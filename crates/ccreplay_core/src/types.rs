//! Core type definitions for ccreplay.

use std::borrow::Borrow;
use std::fmt;

/// Identifier of a transaction in a two-phase locking schedule.
///
/// Smaller ids are older transactions; wound-wait uses this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnId(pub u64);

impl TxnId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical timestamp of an optimistic transaction.
///
/// Doubles as the transaction's label in the schedule. The maximum value
/// stands for an end timestamp that has not been fixed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// End timestamp of a transaction that has not committed.
    pub const INFINITY: Self = Self(u64::MAX);

    /// Creates a new timestamp.
    #[must_use]
    pub const fn new(ts: u64) -> Self {
        Self(ts)
    }

    /// Returns the raw timestamp value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for [`Timestamp::INFINITY`].
    #[must_use]
    pub const fn is_infinite(self) -> bool {
        self.0 == u64::MAX
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Opaque name of a shared data item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataItem(String);

impl DataItem {
    /// Creates a data item from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the item name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DataItem {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for DataItem {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for DataItem {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txn_id_ordering() {
        assert!(TxnId::new(1) < TxnId::new(2));
        assert_eq!(format!("{}", TxnId::new(12)), "12");
    }

    #[test]
    fn timestamp_infinity_is_greatest() {
        assert!(Timestamp::new(u64::MAX - 1) < Timestamp::INFINITY);
        assert!(Timestamp::INFINITY.is_infinite());
        assert_eq!(Timestamp::INFINITY.to_string(), "inf");
    }

    #[test]
    fn data_item_borrows_as_str() {
        let item = DataItem::from("X");
        let name: &str = item.borrow();
        assert_eq!(name, "X");
        assert_eq!(item.to_string(), "X");
    }
}
