//! Two-phase locking command implementation.

use ccreplay_core::samples::{tpl_sample, TPL_SAMPLES};
use ccreplay_core::{CoreError, TplConfig, TplDriver};
use serde::Serialize;
use std::path::Path;

/// Replay options taken from the command line.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Use shared locks and lock upgrading.
    pub upgrade: bool,
    /// Prevent deadlocks with wound-wait.
    pub rollback: bool,
    /// Log per-step state dumps.
    pub verbose: bool,
}

/// Replay report.
#[derive(Debug, Serialize)]
pub struct TplReport {
    /// Schedule as given.
    pub schedule: String,
    /// Whether lock upgrading was enabled.
    pub upgrade: bool,
    /// Whether wound-wait was enabled.
    pub rollback: bool,
    /// `completed` or `deadlock`.
    pub status: &'static str,
    /// Trace tokens.
    pub trace: Vec<String>,
    /// Transactions in commit order.
    pub committed: Vec<u64>,
    /// Wounded transactions and the item they were rolled back at.
    pub rollbacks: Vec<RollbackEntry>,
    /// Requests left waiting on deadlock.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub waiting: Vec<String>,
}

/// A wounded transaction.
#[derive(Debug, Serialize)]
pub struct RollbackEntry {
    /// Transaction id.
    pub txn: u64,
    /// Item the rollback started at.
    pub item: String,
}

/// Picks the schedule text from exactly one input source.
pub fn load_input(
    schedule: Option<String>,
    file: Option<&Path>,
    sample: Option<usize>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(schedule) = schedule {
        return Ok(schedule);
    }
    if let Some(path) = file {
        return Ok(std::fs::read_to_string(path)?);
    }
    if let Some(number) = sample {
        return tpl_sample(number).map(str::to_string).ok_or_else(|| {
            format!("No sample {number}, expected 1-{}", TPL_SAMPLES.len()).into()
        });
    }
    Err("One of --schedule, --file or --sample is required".into())
}

/// Replays `input` and prints the report.
pub fn run(input: &str, options: Options, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = TplConfig::new()
        .upgrade(options.upgrade)
        .rollback(options.rollback)
        .verbose(options.verbose);
    let mut driver = TplDriver::from_input(input, config)?;
    let (report, failure) = replay(input, &mut driver, config);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text(&report),
    }

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Runs `driver` and turns the result into a report.
///
/// A deadlock still yields a report built from the partial trace.
pub fn replay(
    input: &str,
    driver: &mut TplDriver,
    config: TplConfig,
) -> (TplReport, Option<CoreError>) {
    let mut report = TplReport {
        schedule: input.trim().to_string(),
        upgrade: config.upgrade,
        rollback: config.rollback,
        status: "completed",
        trace: Vec::new(),
        committed: Vec::new(),
        rollbacks: Vec::new(),
        waiting: Vec::new(),
    };

    match driver.run() {
        Ok(outcome) => {
            report.trace = outcome.tokens();
            report.committed = outcome.committed.iter().map(|t| t.as_u64()).collect();
            report.rollbacks = outcome
                .rollbacks
                .iter()
                .map(|(txn, item)| RollbackEntry {
                    txn: txn.as_u64(),
                    item: item.to_string(),
                })
                .collect();
            (report, None)
        }
        Err(err) => {
            report.status = "deadlock";
            report.trace = driver.trace().tokens();
            report.waiting = driver.waiting().map(ToString::to_string).collect();
            (report, Some(err))
        }
    }
}

fn print_text(report: &TplReport) {
    println!("Two-Phase Locking Replay");
    println!("========================");
    println!();
    println!("Schedule: {}", report.schedule);
    println!("Upgrade:  {}", if report.upgrade { "on" } else { "off" });
    println!("Rollback: {}", if report.rollback { "on" } else { "off" });
    println!();
    println!("Result: {}", report.trace.join(", "));

    if !report.rollbacks.is_empty() {
        println!();
        println!("Rolled back:");
        for entry in &report.rollbacks {
            println!("  T{} at {}", entry.txn, entry.item);
        }
    }

    if report.status == "deadlock" {
        println!();
        println!("Deadlock detected, still waiting: {}", report.waiting.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_input_is_resolved() {
        let input = load_input(None, None, Some(6)).unwrap();
        assert_eq!(input, TPL_SAMPLES[5]);
        assert!(load_input(None, None, Some(9)).is_err());
        assert!(load_input(None, None, None).is_err());
    }

    #[test]
    fn deadlock_report_keeps_partial_trace() {
        let input = TPL_SAMPLES[5];
        let config = TplConfig::default();
        let mut driver = TplDriver::from_input(input, config).unwrap();
        let (report, failure) = replay(input, &mut driver, config);
        assert!(failure.unwrap().is_deadlock());
        assert_eq!(report.status, "deadlock");
        assert_eq!(report.trace, ["XL1(X)", "W1(X)", "XL2(Y)", "W2(Y)"]);
        assert_eq!(report.waiting.len(), 4);
    }

    #[test]
    fn completed_report_serializes() {
        let input = "R1(X); W1(X); C1";
        let config = TplConfig::new().upgrade(true);
        let mut driver = TplDriver::from_input(input, config).unwrap();
        let (report, failure) = replay(input, &mut driver, config);
        assert!(failure.is_none());
        assert_eq!(report.committed, [1]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["trace"][2], "XU1(X)");
        assert!(json.get("waiting").is_none());
    }
}
