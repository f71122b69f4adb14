//! Optimistic concurrency control driver.

use crate::config::OccConfig;
use crate::error::{CoreError, CoreResult};
use crate::occ::apply::Workspace;
use crate::occ::query::Query;
use crate::occ::transaction::{OccTransaction, TransactionStatus};
use crate::types::{DataItem, Timestamp, TxnId};
use ccreplay_storage::ValueStore;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{debug, info, trace, Level};

/// One observable event of an optimistic replay.
///
/// Ids are the logical timestamp of the transaction when the event
/// happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccEvent {
    /// Transaction ticked for the first time since its (re)start (`S1`).
    Started {
        /// Logical timestamp.
        id: Timestamp,
    },
    /// Read executed (`R1(A)`).
    Read {
        /// Logical timestamp.
        id: Timestamp,
        /// Read item.
        item: DataItem,
    },
    /// Write executed (`W1(A)`).
    Write {
        /// Logical timestamp.
        id: Timestamp,
        /// Written item.
        item: DataItem,
    },
    /// Function executed (`F1(A,B)`).
    Function {
        /// Logical timestamp.
        id: Timestamp,
        /// Input items.
        items: Vec<DataItem>,
    },
    /// Display executed (`D1(A,B)`).
    Display {
        /// Logical timestamp.
        id: Timestamp,
        /// Displayed items.
        items: Vec<DataItem>,
    },
    /// Validation passed (`C1`).
    Committed {
        /// Logical timestamp.
        id: Timestamp,
    },
    /// Validation failed and the transaction was relabelled (`RB2->9`).
    RolledBack {
        /// Logical timestamp before the rollback.
        id: Timestamp,
        /// Logical timestamp the transaction restarts under.
        new_id: Timestamp,
    },
}

impl OccEvent {
    fn executed(id: Timestamp, query: &Query) -> Self {
        match query {
            Query::Read(item) => Self::Read {
                id,
                item: item.clone(),
            },
            Query::Write(item) => Self::Write {
                id,
                item: item.clone(),
            },
            Query::Function { items, .. } => Self::Function {
                id,
                items: items.clone(),
            },
            Query::Display { items, .. } => Self::Display {
                id,
                items: items.clone(),
            },
        }
    }
}

fn join_items(items: &[DataItem]) -> String {
    items
        .iter()
        .map(DataItem::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for OccEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { id } => write!(f, "S{id}"),
            Self::Read { id, item } => write!(f, "R{id}({item})"),
            Self::Write { id, item } => write!(f, "W{id}({item})"),
            Self::Function { id, items } => write!(f, "F{id}({})", join_items(items)),
            Self::Display { id, items } => write!(f, "D{id}({})", join_items(items)),
            Self::Committed { id } => write!(f, "C{id}"),
            Self::RolledBack { id, new_id } => write!(f, "RB{id}->{new_id}"),
        }
    }
}

/// Final state of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Passed validation.
    Committed {
        /// Validation time the transaction committed at.
        end_timestamp: Timestamp,
    },
    /// The schedule ran out before the transaction finished.
    Incomplete,
}

/// What happened to one transaction during a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Original id.
    pub id: TxnId,
    /// Logical timestamp at the end of the replay.
    pub timestamp: Timestamp,
    /// Final state.
    pub status: OutcomeStatus,
    /// Number of rollbacks.
    pub rollbacks: usize,
    /// Renderings of its `Display` operations, when committed work was applied.
    pub displays: Vec<String>,
}

impl TransactionOutcome {
    /// Returns true if the transaction committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Committed { .. })
    }
}

/// Result of an optimistic replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccOutcome {
    /// Ordered event trace.
    pub events: Vec<OccEvent>,
    /// Per-transaction results, in registration order.
    pub transactions: Vec<TransactionOutcome>,
}

impl OccOutcome {
    /// Returns the events rendered as tokens.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    /// Returns the outcome of the transaction registered under `id`.
    #[must_use]
    pub fn transaction(&self, id: u64) -> Option<&TransactionOutcome> {
        self.transactions.iter().find(|t| t.id.as_u64() == id)
    }
}

/// Replays a tick schedule under optimistic concurrency control.
///
/// Each tick executes the next operation of one transaction. A
/// transaction that runs out of operations is validated backwards
/// against every other started transaction. On failure it is rolled
/// back, relabelled with a timestamp past every label in play and its
/// whole operation list is rescheduled at the end.
///
/// Ticks refer to transactions by arena slot, so a relabelled
/// transaction keeps its place in the schedule without renaming ticks.
#[derive(Debug)]
pub struct OccDriver {
    config: OccConfig,
    transactions: Vec<OccTransaction>,
    schedule: VecDeque<usize>,
    /// Started, not rolled back transactions, in start order.
    active: Vec<usize>,
    counter: u64,
    events: Vec<OccEvent>,
    displays: Vec<Vec<String>>,
}

impl OccDriver {
    /// Creates a driver over `transactions` and a schedule of original ids.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTransaction` if two transactions share an id and
    /// `UnknownTransaction` if the schedule names an unregistered id.
    pub fn new(
        transactions: Vec<OccTransaction>,
        schedule: Vec<u64>,
        config: OccConfig,
    ) -> CoreResult<Self> {
        let mut slots = HashMap::with_capacity(transactions.len());
        for (slot, txn) in transactions.iter().enumerate() {
            let id = txn.id().as_u64();
            if slots.insert(id, slot).is_some() {
                return Err(CoreError::DuplicateTransaction { id });
            }
        }

        let schedule = schedule
            .into_iter()
            .map(|id| {
                slots
                    .get(&id)
                    .copied()
                    .ok_or(CoreError::UnknownTransaction { id })
            })
            .collect::<CoreResult<VecDeque<_>>>()?;

        Ok(Self {
            config,
            displays: vec![Vec::new(); transactions.len()],
            transactions,
            schedule,
            active: Vec::new(),
            counter: 0,
            events: Vec::new(),
        })
    }

    /// Runs the schedule to completion without touching any store.
    ///
    /// # Errors
    ///
    /// Returns `TransactionExhausted` for a tick naming a finished
    /// transaction and `RetryLimitExceeded` when the configured rollback
    /// bound is crossed.
    pub fn run(&mut self) -> CoreResult<OccOutcome> {
        while self.advance(None)? {}
        Ok(self.outcome())
    }

    /// Runs the schedule to completion, applying the work of every
    /// committed transaction to `store`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`run`](Self::run) and any store failure.
    pub fn run_with_store(&mut self, store: &mut dyn ValueStore) -> CoreResult<OccOutcome> {
        while self.advance(Some(&mut *store))? {}
        Ok(self.outcome())
    }

    /// Executes the next tick without applying committed work.
    ///
    /// Returns false once the schedule is empty.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn step(&mut self) -> CoreResult<bool> {
        self.advance(None)
    }

    /// Returns the transactions in registration order.
    #[must_use]
    pub fn transactions(&self) -> &[OccTransaction] {
        &self.transactions
    }

    /// Returns the labels of the remaining ticks.
    pub fn schedule(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.schedule
            .iter()
            .map(|&slot| self.transactions[slot].start_timestamp())
    }

    /// Returns the labels of the started transactions.
    pub fn active(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.active
            .iter()
            .map(|&slot| self.transactions[slot].start_timestamp())
    }

    /// Returns the events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[OccEvent] {
        &self.events
    }

    /// Returns the number of ticks executed.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.counter
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> OccConfig {
        self.config
    }

    /// Builds the outcome from the current state.
    #[must_use]
    pub fn outcome(&self) -> OccOutcome {
        let transactions = self
            .transactions
            .iter()
            .zip(&self.displays)
            .map(|(txn, displays)| TransactionOutcome {
                id: txn.id(),
                timestamp: txn.start_timestamp(),
                status: match txn.status() {
                    TransactionStatus::Committed => OutcomeStatus::Committed {
                        end_timestamp: txn.end_timestamp(),
                    },
                    TransactionStatus::Idle | TransactionStatus::Active => {
                        OutcomeStatus::Incomplete
                    }
                },
                rollbacks: txn.rollbacks(),
                displays: displays.clone(),
            })
            .collect();

        OccOutcome {
            events: self.events.clone(),
            transactions,
        }
    }

    fn advance(&mut self, store: Option<&mut dyn ValueStore>) -> CoreResult<bool> {
        let Some(slot) = self.schedule.pop_front() else {
            return Ok(false);
        };
        let label = self.transactions[slot].start_timestamp();

        if self.transactions[slot].is_finished() {
            return Err(CoreError::TransactionExhausted {
                id: label.as_u64(),
            });
        }

        if !self.active.contains(&slot) {
            debug!(txn = %label, "transaction started");
            self.active.push(slot);
            self.events.push(OccEvent::Started { id: label });
        }

        let txn = &mut self.transactions[slot];
        if let Some(query) = txn.execute_next() {
            self.events.push(OccEvent::executed(label, query));
        }

        if self.transactions[slot].is_finished() {
            self.validate(slot, label, store)?;
        }

        self.dump_state(label);
        self.counter += 1;
        Ok(true)
    }

    fn validate(
        &mut self,
        slot: usize,
        label: Timestamp,
        store: Option<&mut dyn ValueStore>,
    ) -> CoreResult<()> {
        let validation = Timestamp::new(label.as_u64() + self.counter);
        let finishing = &self.transactions[slot];
        let conflict = self
            .active
            .iter()
            .copied()
            .filter(|&other| other != slot)
            .find(|&other| !finishing.validates_against(validation, &self.transactions[other]));

        match conflict {
            None => self.commit(slot, validation, store),
            Some(other) => {
                debug!(
                    txn = %label,
                    conflicting = %self.transactions[other].start_timestamp(),
                    %validation,
                    "validation failed"
                );
                self.rollback(slot, label)
            }
        }
    }

    fn commit(
        &mut self,
        slot: usize,
        end: Timestamp,
        store: Option<&mut dyn ValueStore>,
    ) -> CoreResult<()> {
        let txn = &mut self.transactions[slot];
        txn.mark_committed(end);
        debug!(txn = %txn.start_timestamp(), end = %end, "transaction committed");
        self.events.push(OccEvent::Committed {
            id: txn.start_timestamp(),
        });

        if let Some(store) = store {
            self.displays[slot] = Workspace::new().apply(txn.queries(), store)?;
        }
        Ok(())
    }

    fn rollback(&mut self, slot: usize, label: Timestamp) -> CoreResult<()> {
        if let Some(limit) = self.config.max_rollbacks {
            if self.transactions[slot].rollbacks() >= limit {
                return Err(CoreError::RetryLimitExceeded {
                    id: self.transactions[slot].id().as_u64(),
                    limit,
                });
            }
        }

        self.schedule.retain(|&s| s != slot);
        self.active.retain(|&s| s != slot);

        let tail = label.as_u64() + self.counter + self.schedule.len() as u64;
        let newest = self
            .transactions
            .iter()
            .map(|t| t.start_timestamp().as_u64())
            .max()
            .unwrap_or(0);
        let new_label = Timestamp::new(tail.max(newest + 1));

        let txn = &mut self.transactions[slot];
        txn.rollback(new_label);
        self.schedule.extend(std::iter::repeat(slot).take(txn.len()));
        debug!(txn = %label, new_txn = %new_label, "transaction rolled back");
        self.events.push(OccEvent::RolledBack {
            id: label,
            new_id: new_label,
        });
        Ok(())
    }

    fn dump_state(&self, label: Timestamp) {
        if !self.config.verbose && !tracing::enabled!(Level::TRACE) {
            return;
        }
        let schedule: Vec<u64> = self.schedule().map(Timestamp::as_u64).collect();
        let active: Vec<u64> = self.active().map(Timestamp::as_u64).collect();
        if self.config.verbose {
            info!(
                tick = self.counter,
                txn = %label,
                schedule = ?schedule,
                active = ?active,
                "replay tick"
            );
        } else {
            trace!(
                tick = self.counter,
                txn = %label,
                schedule = ?schedule,
                active = ?active,
                "replay tick"
            );
        }
    }
}
