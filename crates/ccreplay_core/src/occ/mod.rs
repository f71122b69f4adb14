//! Optimistic concurrency control replay.
//!
//! Transactions run without locks. Each schedule tick executes the next
//! operation of one transaction, recording what it read and wrote. When
//! a transaction runs out of operations it is validated backwards
//! against every other started transaction; on success its deferred work
//! is applied to a value store, on failure it is relabelled with a later
//! timestamp and rescheduled from scratch at the end of the schedule.

mod apply;
mod driver;
mod query;
mod transaction;

pub use driver::{OccDriver, OccEvent, OccOutcome, OutcomeStatus, TransactionOutcome};
pub use query::{Query, RenderFn, ValueFn};
pub use transaction::{passes_validation, OccTransaction, TransactionStatus};
