//! Result trace of a two-phase locking replay.

use crate::lock::LockMode;
use crate::schedule::{Operation, Request};
use crate::types::{DataItem, TxnId};
use std::fmt;

/// One observable event of a two-phase locking replay.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// Lock granted (`XL1(X)` / `SL1(X)`).
    Lock {
        /// Holder.
        txn: TxnId,
        /// Locked item.
        item: DataItem,
        /// Granted mode.
        mode: LockMode,
    },
    /// Held lock changed mode (`XU1(X)` / `SU1(X)`).
    Upgrade {
        /// Holder.
        txn: TxnId,
        /// Locked item.
        item: DataItem,
        /// New mode.
        mode: LockMode,
    },
    /// Lock released at commit (`UL1(X)`).
    Unlock {
        /// Former holder.
        txn: TxnId,
        /// Released item.
        item: DataItem,
    },
    /// Read executed (`R1(X)`).
    Read {
        /// Reader.
        txn: TxnId,
        /// Read item.
        item: DataItem,
    },
    /// Write executed (`W1(X)`).
    Write {
        /// Writer.
        txn: TxnId,
        /// Written item.
        item: DataItem,
    },
    /// Transaction committed (`C1`).
    Commit {
        /// Committed transaction.
        txn: TxnId,
    },
    /// Transaction wounded at an item (`RB1(X)`).
    Rollback {
        /// Rolled back transaction.
        txn: TxnId,
        /// Item whose lock acquisition the rollback starts at.
        item: DataItem,
    },
}

impl TraceEvent {
    /// Returns the event recording that `request` was executed.
    #[must_use]
    pub fn executed(request: &Request) -> Self {
        let txn = request.txn;
        match &request.operation {
            Operation::Read(item) => Self::Read {
                txn,
                item: item.clone(),
            },
            Operation::Write(item) => Self::Write {
                txn,
                item: item.clone(),
            },
            Operation::Commit => Self::Commit { txn },
        }
    }

    /// Returns the transaction the event belongs to.
    #[must_use]
    pub fn txn(&self) -> TxnId {
        match self {
            Self::Lock { txn, .. }
            | Self::Upgrade { txn, .. }
            | Self::Unlock { txn, .. }
            | Self::Read { txn, .. }
            | Self::Write { txn, .. }
            | Self::Commit { txn }
            | Self::Rollback { txn, .. } => *txn,
        }
    }

    /// Returns true if this event grants `item` to `txn`.
    #[must_use]
    pub fn is_lock_of(&self, txn: TxnId, item: &DataItem) -> bool {
        matches!(self, Self::Lock { txn: t, item: i, .. } if *t == txn && i == item)
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock { txn, item, mode } => write!(f, "{}L{txn}({item})", mode.code()),
            Self::Upgrade { txn, item, mode } => write!(f, "{}U{txn}({item})", mode.code()),
            Self::Unlock { txn, item } => write!(f, "UL{txn}({item})"),
            Self::Read { txn, item } => write!(f, "R{txn}({item})"),
            Self::Write { txn, item } => write!(f, "W{txn}({item})"),
            Self::Commit { txn } => write!(f, "C{txn}"),
            Self::Rollback { txn, item } => write!(f, "RB{txn}({item})"),
        }
    }
}

/// Append-only list of trace events.
///
/// The only removal is [`Trace::discard_from`], used when a wounded
/// transaction loses the suffix of its own activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Returns the events rendered as tokens.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the position of the first lock grant of `item` to `txn`.
    #[must_use]
    pub fn lock_position(&self, txn: TxnId, item: &DataItem) -> Option<usize> {
        self.events.iter().position(|e| e.is_lock_of(txn, item))
    }

    /// Removes every event of `txn` at or after `start`.
    ///
    /// Events of other transactions are kept. Returns the removed events
    /// in their original order.
    pub fn discard_from(&mut self, txn: TxnId, start: usize) -> Vec<TraceEvent> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.events.len());
        for (index, event) in self.events.drain(..).enumerate() {
            if index >= start && event.txn() == txn {
                removed.push(event);
            } else {
                kept.push(event);
            }
        }
        self.events = kept;
        removed
    }

    /// Consumes the trace, returning its events.
    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, event) in self.events.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{event}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: u64) -> TxnId {
        TxnId::new(id)
    }

    #[test]
    fn token_vocabulary() {
        let x = DataItem::from("X");
        let events = [
            TraceEvent::Lock { txn: t(1), item: x.clone(), mode: LockMode::Exclusive },
            TraceEvent::Lock { txn: t(1), item: x.clone(), mode: LockMode::Shared },
            TraceEvent::Upgrade { txn: t(1), item: x.clone(), mode: LockMode::Exclusive },
            TraceEvent::Upgrade { txn: t(1), item: x.clone(), mode: LockMode::Shared },
            TraceEvent::Unlock { txn: t(1), item: x.clone() },
            TraceEvent::Read { txn: t(1), item: x.clone() },
            TraceEvent::Write { txn: t(1), item: x.clone() },
            TraceEvent::Commit { txn: t(1) },
            TraceEvent::Rollback { txn: t(1), item: x },
        ];
        let tokens: Vec<String> = events.iter().map(ToString::to_string).collect();
        assert_eq!(
            tokens,
            ["XL1(X)", "SL1(X)", "XU1(X)", "SU1(X)", "UL1(X)", "R1(X)", "W1(X)", "C1", "RB1(X)"]
        );
    }

    #[test]
    fn discard_from_only_touches_one_transaction() {
        let x = DataItem::from("X");
        let mut trace = Trace::new();
        trace.push(TraceEvent::Read { txn: t(2), item: x.clone() });
        trace.push(TraceEvent::Lock { txn: t(3), item: x.clone(), mode: LockMode::Shared });
        trace.push(TraceEvent::Read { txn: t(3), item: x.clone() });
        trace.push(TraceEvent::Read { txn: t(2), item: x.clone() });

        let start = trace.lock_position(t(3), &x).unwrap();
        assert_eq!(start, 1);
        let removed = trace.discard_from(t(3), start);

        assert_eq!(removed.len(), 2);
        assert_eq!(trace.tokens(), ["R2(X)", "R2(X)"]);
    }

    #[test]
    fn display_joins_tokens() {
        let mut trace = Trace::new();
        trace.push(TraceEvent::Commit { txn: t(1) });
        trace.push(TraceEvent::Commit { txn: t(2) });
        assert_eq!(trace.to_string(), "C1; C2");
    }
}
