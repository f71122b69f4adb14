//! Lock bookkeeping for two-phase locking.
//!
//! The lock table is a pure state container: it records who holds what
//! and in which mode. Every conflict decision is made by the driver in
//! [`crate::tpl`].

mod table;

pub use table::{Grant, LockMode, LockTable};
