//! Sample inputs and temporary stores.
//!
//! The sample schedules and their expected traces double as golden
//! tests for the two-phase locking driver.

use ccreplay_core::samples::TPL_SAMPLES;
use ccreplay_core::{CoreResult, TplConfig, TplDriver, TplOutcome};
use ccreplay_storage::FileStore;
use std::ops::{Deref, DerefMut};
use tempfile::TempDir;

/// What a replay is expected to produce.
#[derive(Debug, Clone, Copy)]
pub enum Expected {
    /// The run completes with exactly this trace.
    Trace(&'static [&'static str]),
    /// The run deadlocks after producing exactly this trace.
    Deadlock(&'static [&'static str]),
}

/// A schedule, its options and the expected result.
#[derive(Debug, Clone, Copy)]
pub struct TplCase {
    /// Short name for assertion messages.
    pub name: &'static str,
    /// Schedule text.
    pub schedule: &'static str,
    /// Replay options.
    pub config: TplConfig,
    /// Expected result.
    pub expected: Expected,
}

impl TplCase {
    /// Replays the case and asserts the expected result.
    pub fn verify(&self) {
        let mut driver =
            TplDriver::from_input(self.schedule, self.config).expect("sample schedule parses");
        match (driver.run(), self.expected) {
            (Ok(outcome), Expected::Trace(trace)) => {
                assert_eq!(outcome.tokens(), trace, "case {}", self.name);
            }
            (Err(err), Expected::Deadlock(trace)) => {
                assert!(err.is_deadlock(), "case {}: {err}", self.name);
                assert_eq!(driver.trace().tokens(), trace, "case {}", self.name);
            }
            (result, expected) => {
                panic!("case {}: expected {expected:?}, got {result:?}", self.name)
            }
        }
    }
}

/// Runs schedule text to completion.
pub fn run_tpl(input: &str, config: TplConfig) -> CoreResult<TplOutcome> {
    TplDriver::from_input(input, config)?.run()
}

/// Sample schedules with known results.
#[must_use]
pub fn tpl_cases() -> Vec<TplCase> {
    vec![
        TplCase {
            name: "sample 1",
            schedule: TPL_SAMPLES[0],
            config: TplConfig::new(),
            expected: Expected::Trace(&[
                "XL1(X)", "R1(X)", "XL3(Y)", "W3(Y)", "W1(X)", "C1", "UL1(X)", "XL2(X)",
                "W2(X)", "C3", "UL3(Y)", "XL2(Y)", "W2(Y)", "C2", "UL2(X)", "UL2(Y)",
            ]),
        },
        TplCase {
            name: "sample 1 with upgrade",
            schedule: TPL_SAMPLES[0],
            config: TplConfig::new().upgrade(true),
            expected: Expected::Trace(&[
                "SL1(X)", "R1(X)", "XL3(Y)", "W3(Y)", "XU1(X)", "W1(X)", "C1", "UL1(X)",
                "XL2(X)", "W2(X)", "C3", "UL3(Y)", "XL2(Y)", "W2(Y)", "C2", "UL2(X)", "UL2(Y)",
            ]),
        },
        TplCase {
            name: "sample 3 with upgrade",
            schedule: TPL_SAMPLES[2],
            config: TplConfig::new().upgrade(true),
            expected: Expected::Trace(&[
                "SL1(X)", "R1(X)", "SL2(Y)", "R2(Y)", "SL1(Y)", "R1(Y)", "SL2(X)", "R2(X)",
                "C1", "UL1(X)", "UL1(Y)", "C2", "UL2(Y)", "UL2(X)",
            ]),
        },
        TplCase {
            name: "sample 5 with upgrade and rollback",
            schedule: TPL_SAMPLES[4],
            config: TplConfig::new().upgrade(true).rollback(true),
            expected: Expected::Trace(&[
                "SL1(X)", "R1(X)", "RB2(X)", "XU1(X)", "W1(X)", "XL3(Y)", "W3(Y)", "C1",
                "UL1(X)", "C3", "UL3(Y)",
            ]),
        },
        TplCase {
            name: "sample 6",
            schedule: TPL_SAMPLES[5],
            config: TplConfig::new(),
            expected: Expected::Deadlock(&["XL1(X)", "W1(X)", "XL2(Y)", "W2(Y)"]),
        },
        TplCase {
            name: "older requester wounds both shared holders",
            schedule: "R2(X); R3(X); W1(X); C1; C2; C3",
            config: TplConfig::new().upgrade(true).rollback(true),
            expected: Expected::Trace(&[
                "RB2(X)", "RB3(X)", "XL1(X)", "W1(X)", "C1", "UL1(X)",
            ]),
        },
        TplCase {
            name: "younger requester waits for the older holder",
            schedule: "W1(X); W2(X); C1; C2",
            config: TplConfig::new().rollback(true),
            expected: Expected::Trace(&[
                "XL1(X)", "W1(X)", "C1", "UL1(X)", "XL2(X)", "W2(X)", "C2", "UL2(X)",
            ]),
        },
    ]
}

/// A file store in a temporary directory, removed on drop.
pub struct TempStore {
    store: FileStore,
    _temp_dir: TempDir,
}

impl TempStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
        Self {
            store,
            _temp_dir: temp_dir,
        }
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TempStore {
    type Target = FileStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for TempStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}
