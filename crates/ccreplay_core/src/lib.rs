//! # ccreplay Core
//!
//! Deterministic replay engine for database concurrency-control protocols.
//!
//! Given transactions and a caller-supplied interleaving, the engine
//! replays the interleaving under one protocol and reports what a
//! serializable execution of it looks like:
//!
//! - [`TplDriver`] - rigorous two-phase locking with optional lock
//!   upgrading and wound-wait deadlock prevention
//! - [`OccDriver`] - optimistic concurrency control with backward
//!   validation and rollback-and-reschedule
//!
//! Execution is single-threaded. "Blocking" is a request parked in a
//! queue, never a parked thread.
//!
//! ## Example
//!
//! ```rust
//! use ccreplay_core::{TplConfig, TplDriver};
//!
//! let mut driver = TplDriver::from_input("R1(X); W2(X); C1; C2;", TplConfig::default()).unwrap();
//! let outcome = driver.run().unwrap();
//! assert_eq!(
//!     outcome.tokens(),
//!     ["XL1(X)", "R1(X)", "C1", "UL1(X)", "XL2(X)", "W2(X)", "C2", "UL2(X)"]
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod lock;
pub mod occ;
pub mod samples;
pub mod schedule;
pub mod tpl;
pub mod types;

pub use config::{OccConfig, TplConfig};
pub use error::{CoreError, CoreResult};
pub use lock::{Grant, LockMode, LockTable};
pub use occ::{
    OccDriver, OccEvent, OccOutcome, OccTransaction, OutcomeStatus, Query, TransactionOutcome,
    TransactionStatus,
};
pub use schedule::{parse_input, parse_schedule, Operation, Request};
pub use tpl::{TplDriver, TplOutcome, Trace, TraceEvent};
pub use types::{DataItem, Timestamp, TxnId};

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
