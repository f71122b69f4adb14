//! CLI command implementations.

pub mod occ;
pub mod samples;
pub mod tpl;
