//! Rigorous two-phase locking replay.
//!
//! The driver consumes a flat schedule of [`crate::Request`]s one at a
//! time, asks the [`crate::LockTable`] who holds what, parks blocked
//! requests in a FIFO waiting queue and releases every lock of a
//! transaction only when it commits. With wound-wait enabled, an older
//! requester preempts younger holders by rolling them back at the
//! contested item.

mod driver;
mod trace;

pub use driver::{TplDriver, TplOutcome};
pub use trace::{Trace, TraceEvent};
