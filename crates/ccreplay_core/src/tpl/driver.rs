//! Two-phase locking driver.

use crate::config::TplConfig;
use crate::error::{CoreError, CoreResult};
use crate::lock::{LockMode, LockTable};
use crate::schedule::{parse_input, parse_schedule, Operation, Request};
use crate::tpl::trace::{Trace, TraceEvent};
use crate::types::{DataItem, TxnId};
use std::collections::VecDeque;
use tracing::{debug, info, trace, Level};

/// Result of a completed two-phase locking replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TplOutcome {
    /// Final execution trace.
    pub trace: Trace,
    /// Transactions in the order they committed.
    pub committed: Vec<TxnId>,
    /// Wounded transactions and the item each was rolled back at.
    pub rollbacks: Vec<(TxnId, DataItem)>,
}

impl TplOutcome {
    /// Returns the trace rendered as tokens.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.trace.tokens()
    }
}

/// Replays a schedule under rigorous two-phase locking.
///
/// Requests are evaluated strictly in schedule order. A request is only
/// ever reordered by being parked in the waiting queue (and flushed back
/// to the front of the schedule when some transaction releases its
/// locks) or by a wound-wait preemption, which puts the winning request
/// back at the very front.
///
/// The driver owns its lock table, waiting queue and trace. After a
/// failed [`run`](Self::run) they remain inspectable.
#[derive(Debug)]
pub struct TplDriver {
    config: TplConfig,
    /// Schedule as submitted, used to find a wounded transaction's suffix.
    submitted: Vec<Request>,
    /// Requests not yet evaluated.
    pending: VecDeque<Request>,
    locks: LockTable,
    waiting: VecDeque<Request>,
    trace: Trace,
    committed: Vec<TxnId>,
    rollbacks: Vec<(TxnId, DataItem)>,
    steps: u64,
}

impl TplDriver {
    /// Creates a driver over an already parsed schedule.
    #[must_use]
    pub fn new(schedule: Vec<Request>, config: TplConfig) -> Self {
        Self {
            config,
            pending: schedule.iter().cloned().collect(),
            submitted: schedule,
            locks: LockTable::new(),
            waiting: VecDeque::new(),
            trace: Trace::new(),
            committed: Vec::new(),
            rollbacks: Vec::new(),
            steps: 0,
        }
    }

    /// Creates a driver from schedule text such as `"R1(X); W2(X); C1; C2"`.
    ///
    /// # Errors
    ///
    /// Returns a parse error for any malformed token.
    pub fn from_input(input: &str, config: TplConfig) -> CoreResult<Self> {
        let schedule = parse_schedule(&parse_input(input))?;
        Ok(Self::new(schedule, config))
    }

    /// Runs the schedule to completion.
    ///
    /// # Errors
    ///
    /// Returns `Deadlock` if the schedule empties while requests are still
    /// waiting. The trace accumulated so far stays available through
    /// [`trace`](Self::trace).
    pub fn run(&mut self) -> CoreResult<TplOutcome> {
        while self.step() {}

        if !self.waiting.is_empty() {
            debug!(
                waiting = self.waiting.len(),
                "schedule exhausted with blocked requests"
            );
            return Err(CoreError::Deadlock {
                waiting: self.waiting.iter().cloned().collect(),
            });
        }

        Ok(TplOutcome {
            trace: self.trace.clone(),
            committed: self.committed.clone(),
            rollbacks: self.rollbacks.clone(),
        })
    }

    /// Evaluates the next pending request.
    ///
    /// Returns false once the schedule is empty.
    pub fn step(&mut self) -> bool {
        let Some(request) = self.pending.pop_front() else {
            return false;
        };
        self.steps += 1;

        match &request.operation {
            Operation::Read(item) | Operation::Write(item) => {
                let mode = self.requested_mode(&request.operation);
                let item = item.clone();
                self.process_read_write(request.clone(), &item, mode);
            }
            Operation::Commit => self.process_commit(request.clone()),
        }

        self.dump_state(&request);
        true
    }

    /// Returns the trace recorded so far.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Returns the lock table.
    #[must_use]
    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    /// Returns the waiting queue in FIFO order.
    pub fn waiting(&self) -> impl Iterator<Item = &Request> {
        self.waiting.iter()
    }

    /// Returns the requests not yet evaluated.
    pub fn pending(&self) -> impl Iterator<Item = &Request> {
        self.pending.iter()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> TplConfig {
        self.config
    }

    /// Mode a data operation needs under the current configuration.
    fn requested_mode(&self, operation: &Operation) -> LockMode {
        match operation {
            Operation::Read(_) if self.config.upgrade => LockMode::Shared,
            _ => LockMode::Exclusive,
        }
    }

    fn is_waiting(&self, txn: TxnId) -> bool {
        self.waiting.iter().any(|r| r.txn == txn)
    }

    fn enqueue(&mut self, request: Request) {
        debug!(request = %request, "request blocked");
        self.waiting.push_back(request);
    }

    /// Moves the whole waiting queue, in FIFO order, to the schedule front.
    fn flush_waiting(&mut self) {
        while let Some(request) = self.waiting.pop_back() {
            self.pending.push_front(request);
        }
    }

    fn record_executed(&mut self, request: &Request) {
        self.trace.push(TraceEvent::executed(request));
    }

    fn process_read_write(&mut self, request: Request, item: &DataItem, mode: LockMode) {
        let txn = request.txn;

        // A transaction never overtakes its own blocked request.
        if self.is_waiting(txn) {
            self.enqueue(request);
            return;
        }

        let Some(current) = self.locks.mode_of(item) else {
            self.locks.acquire(txn, item, mode);
            self.trace.push(TraceEvent::Lock {
                txn,
                item: item.clone(),
                mode,
            });
            self.record_executed(&request);
            return;
        };

        if let Some(held) = self.locks.grant_mode(txn, item) {
            if held.covers(mode) {
                self.record_executed(&request);
                return;
            }
            if self.config.upgrade && !self.locks.is_shared(item) {
                debug!(%txn, %item, from = ?held, to = ?mode, "lock upgraded");
                self.locks.upgrade(txn, item, mode);
                self.trace.push(TraceEvent::Upgrade {
                    txn,
                    item: item.clone(),
                    mode,
                });
                self.record_executed(&request);
                return;
            }
        }

        if self.config.upgrade && mode.is_compatible_with(current) {
            self.locks.acquire(txn, item, mode);
            self.trace.push(TraceEvent::Lock {
                txn,
                item: item.clone(),
                mode,
            });
            self.record_executed(&request);
            return;
        }

        if self.config.rollback {
            self.wound_wait(request, item);
            return;
        }

        self.enqueue(request);
    }

    fn process_commit(&mut self, request: Request) {
        let txn = request.txn;
        if self.is_waiting(txn) {
            self.enqueue(request);
            return;
        }

        self.record_executed(&request);
        self.committed.push(txn);
        debug!(%txn, "transaction committed");

        if self.locks.holds_any(txn) {
            for item in self.locks.release(txn) {
                self.trace.push(TraceEvent::Unlock { txn, item });
            }
            self.flush_waiting();
        }
    }

    /// Resolves a conflict on `item` by transaction age.
    ///
    /// The oldest (smallest id) among the holders and the requester wins.
    /// A younger requester waits; the oldest requester rolls back every
    /// other holder and is re-evaluated first.
    fn wound_wait(&mut self, request: Request, item: &DataItem) {
        let txn = request.txn;
        let holders = self.locks.holder_ids(item);
        let oldest = holders.iter().copied().chain([txn]).min().unwrap_or(txn);

        if oldest != txn {
            debug!(%txn, %item, %oldest, "younger requester waits");
            self.enqueue(request);
            return;
        }

        let victims: Vec<TxnId> = holders.into_iter().filter(|&h| h != txn).collect();
        debug!(%txn, %item, ?victims, "older requester wounds holders");
        for victim in victims {
            self.rollback_transaction(victim, item);
        }
        self.pending.push_front(request);
    }

    /// Rolls `victim` back to the point where it acquired `item`.
    ///
    /// Everything the victim logged from that lock grant onwards leaves
    /// the trace, and the matching suffix of its submitted requests is
    /// dropped from the pending schedule and the waiting queue so it is
    /// never replayed. Work done before the grant stays.
    fn rollback_transaction(&mut self, victim: TxnId, item: &DataItem) {
        let removed = match self.trace.lock_position(victim, item) {
            Some(start) => self.trace.discard_from(victim, start),
            None => Vec::new(),
        };

        let own: Vec<&Request> = self.submitted.iter().filter(|r| r.txn == victim).collect();
        let suffix: Vec<Request> = own
            .iter()
            .position(|r| removed.contains(&TraceEvent::executed(r)))
            .map(|start| own[start..].iter().map(|r| (*r).clone()).collect())
            .unwrap_or_default();

        self.pending.retain(|r| !suffix.contains(r));
        self.waiting.retain(|r| !suffix.contains(r));

        debug!(
            %victim,
            %item,
            discarded_events = removed.len(),
            discarded_requests = suffix.len(),
            "transaction rolled back"
        );
        self.trace.push(TraceEvent::Rollback {
            txn: victim,
            item: item.clone(),
        });
        self.rollbacks.push((victim, item.clone()));
        self.locks.release(victim);
        self.flush_waiting();
    }

    fn dump_state(&self, request: &Request) {
        if !self.config.verbose && !tracing::enabled!(Level::TRACE) {
            return;
        }
        let pending: Vec<String> = self.pending.iter().map(ToString::to_string).collect();
        let waiting: Vec<String> = self.waiting.iter().map(ToString::to_string).collect();
        if self.config.verbose {
            info!(
                step = self.steps,
                request = %request,
                pending = ?pending,
                locks = %self.locks,
                waiting = ?waiting,
                trace = %self.trace,
                "replay step"
            );
        } else {
            trace!(
                step = self.steps,
                request = %request,
                pending = ?pending,
                locks = %self.locks,
                waiting = ?waiting,
                "replay step"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str, config: TplConfig) -> CoreResult<TplOutcome> {
        TplDriver::from_input(input, config)?.run()
    }

    #[test]
    fn single_transaction_locks_and_unlocks() {
        let outcome = run("R1(A); W1(A); C1", TplConfig::default()).unwrap();
        assert_eq!(outcome.tokens(), ["XL1(A)", "R1(A)", "W1(A)", "C1", "UL1(A)"]);
        assert_eq!(outcome.committed, vec![TxnId::new(1)]);
    }

    #[test]
    fn conflicting_write_waits_for_commit() {
        let outcome = run("W1(X); W2(X); C1; C2", TplConfig::default()).unwrap();
        assert_eq!(
            outcome.tokens(),
            ["XL1(X)", "W1(X)", "C1", "UL1(X)", "XL2(X)", "W2(X)", "C2", "UL2(X)"]
        );
    }

    #[test]
    fn blocked_transaction_keeps_its_own_order() {
        // W2(Y) is free but must not overtake the blocked W2(X).
        let outcome = run("W1(X); W2(X); W2(Y); C1; C2", TplConfig::default()).unwrap();
        assert_eq!(
            outcome.tokens(),
            ["XL1(X)", "W1(X)", "C1", "UL1(X)", "XL2(X)", "W2(X)", "XL2(Y)", "W2(Y)", "C2", "UL2(X)", "UL2(Y)"]
        );
    }

    #[test]
    fn exclusive_holder_reads_without_new_lock() {
        let config = TplConfig::new().upgrade(true);
        let outcome = run("W1(X); R1(X); C1", config).unwrap();
        assert_eq!(outcome.tokens(), ["XL1(X)", "W1(X)", "R1(X)", "C1", "UL1(X)"]);
    }

    #[test]
    fn shared_holder_upgrades_when_alone() {
        let config = TplConfig::new().upgrade(true);
        let outcome = run("R1(X); W1(X); C1", config).unwrap();
        assert_eq!(outcome.tokens(), ["SL1(X)", "R1(X)", "XU1(X)", "W1(X)", "C1", "UL1(X)"]);
    }

    #[test]
    fn co_held_item_blocks_upgrade_until_release() {
        let config = TplConfig::new().upgrade(true);
        let outcome = run("R1(X); R2(X); W1(X); C2; C1", config).unwrap();
        assert_eq!(
            outcome.tokens(),
            ["SL1(X)", "R1(X)", "SL2(X)", "R2(X)", "C2", "UL2(X)", "XU1(X)", "W1(X)", "C1", "UL1(X)"]
        );
    }

    #[test]
    fn deadlock_is_reported_with_trace() {
        let mut driver =
            TplDriver::from_input("W1(X); W2(Y); W1(Y); W2(X); C1; C2", TplConfig::default())
                .unwrap();
        let err = driver.run().unwrap_err();
        match err {
            CoreError::Deadlock { waiting } => assert_eq!(waiting.len(), 4),
            other => panic!("expected deadlock, got {other:?}"),
        }
        assert_eq!(driver.trace().tokens(), ["XL1(X)", "W1(X)", "XL2(Y)", "W2(Y)"]);
    }

    #[test]
    fn wound_wait_older_requester_wounds_younger_holder() {
        let config = TplConfig::new().rollback(true);
        let outcome = run("W2(X); W1(X); C1; C2", config).unwrap();
        assert_eq!(
            outcome.tokens(),
            ["RB2(X)", "XL1(X)", "W1(X)", "C1", "UL1(X)"]
        );
        assert_eq!(outcome.rollbacks, vec![(TxnId::new(2), DataItem::from("X"))]);
        assert_eq!(outcome.committed, vec![TxnId::new(1)]);
    }

    #[test]
    fn wound_wait_younger_requester_waits() {
        let config = TplConfig::new().rollback(true);
        let mut driver = TplDriver::from_input("W1(X); W2(X)", config).unwrap();
        assert!(driver.step());
        assert!(driver.step());
        let waiting: Vec<String> = driver.waiting().map(ToString::to_string).collect();
        assert_eq!(waiting, ["W2(X)"]);
        assert!(driver.run().unwrap_err().is_deadlock());
    }

    #[test]
    fn rollback_keeps_victim_prefix() {
        // T2 read Y before it touched X; only the work from XL2(X) on is undone.
        let config = TplConfig::new().rollback(true);
        let outcome = run("R2(Y); W2(X); W1(X); C1; C2", config).unwrap();
        assert_eq!(
            outcome.tokens(),
            ["XL2(Y)", "R2(Y)", "RB2(X)", "XL1(X)", "W1(X)", "C1", "UL1(X)"]
        );
    }

    #[test]
    fn rollback_readmits_waiting_requests() {
        // W3(Y) waits on T2; wounding T2 frees Y before C1 releases anything.
        let config = TplConfig::new().upgrade(true).rollback(true);
        let outcome = run("R1(X); R2(X); W2(Y); W3(Y); W1(X); C1; C2; C3", config).unwrap();
        assert_eq!(
            outcome.tokens(),
            ["SL1(X)", "R1(X)", "RB2(X)", "XU1(X)", "W1(X)", "XL3(Y)", "W3(Y)", "C1", "UL1(X)", "C3", "UL3(Y)"]
        );
        assert_eq!(outcome.committed, vec![TxnId::new(1), TxnId::new(3)]);
    }

    #[test]
    fn verbose_dump_does_not_change_the_trace() {
        let input = "R1(X); R2(X); W2(Y); W3(Y); W1(X); C1; C2; C3";
        let quiet = run(input, TplConfig::new().rollback(true)).unwrap();
        let verbose = run(input, TplConfig::new().rollback(true).verbose(true)).unwrap();
        assert_eq!(quiet, verbose);
    }

    #[test]
    fn lock_table_is_fresh_per_driver() {
        let mut first = TplDriver::from_input("W1(X)", TplConfig::default()).unwrap();
        first.run().unwrap();
        assert!(first.lock_table().is_locked(&DataItem::from("X")));

        let second = TplDriver::from_input("W2(X)", TplConfig::default()).unwrap();
        assert!(second.lock_table().is_empty());
    }

    #[test]
    fn invalid_token_fails_before_running() {
        let err = TplDriver::from_input("R1(X); Q2(X)", TplConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }
}
