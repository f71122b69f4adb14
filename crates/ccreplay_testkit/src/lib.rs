//! # ccreplay Testkit
//!
//! Test utilities for ccreplay.
//!
//! This crate provides:
//! - Sample schedules with their expected replay results
//! - Temporary value stores
//! - Property-based test generators using proptest
//! - Trace and lock-table checks shared by the integration tests
//!
//! ## Usage
//!
//! ```rust
//! use ccreplay_testkit::prelude::*;
//!
//! for case in tpl_cases() {
//!     case.verify();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod checks;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::checks::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use checks::*;
pub use fixtures::*;
pub use generators::*;
