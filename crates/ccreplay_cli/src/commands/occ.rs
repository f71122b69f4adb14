//! Optimistic concurrency control command implementation.

use ccreplay_core::samples::occ_demo;
use ccreplay_core::{OccConfig, OccDriver, OccOutcome, OccTransaction, OutcomeStatus, Query};
use ccreplay_storage::FileStore;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A replay scenario read from JSON.
///
/// ```json
/// {
///   "transactions": [
///     {"id": 1, "operations": [{"read": "A"}, {"sum": ["A", "B"]}, {"write": "A"}]}
///   ],
///   "schedule": [1, 1, 1]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    /// Transactions with their operations.
    pub transactions: Vec<TransactionSpec>,
    /// Original transaction ids, one per tick.
    pub schedule: Vec<u64>,
}

/// One transaction of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionSpec {
    /// Transaction id, also its initial timestamp.
    pub id: u64,
    /// Operations in execution order.
    pub operations: Vec<OperationSpec>,
}

/// One operation of a scenario transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationSpec {
    /// Read an item.
    Read(String),
    /// Write an item.
    Write(String),
    /// Store the sum of the items in the first one.
    Sum(Vec<String>),
    /// Display the items.
    Display(Vec<String>),
}

impl OperationSpec {
    fn to_query(&self) -> Query {
        match self {
            Self::Read(item) => Query::read(item.as_str()),
            Self::Write(item) => Query::write(item.as_str()),
            Self::Sum(items) => Query::function(items.iter().map(String::as_str), |values| {
                values.iter().fold(0u64, |acc, v| acc.wrapping_add(*v))
            }),
            Self::Display(items) => Query::display(items.iter().map(String::as_str)),
        }
    }
}

impl Scenario {
    /// Loads a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Returns the built-in two-transaction scenario.
    #[must_use]
    pub fn sample() -> Self {
        let operations = vec![
            OperationSpec::Read("B".into()),
            OperationSpec::Write("B".into()),
            OperationSpec::Read("A".into()),
            OperationSpec::Write("A".into()),
        ];
        let (_, schedule) = occ_demo();
        Self {
            transactions: vec![
                TransactionSpec {
                    id: 1,
                    operations: operations.clone(),
                },
                TransactionSpec { id: 2, operations },
            ],
            schedule,
        }
    }

    /// Builds the engine transactions.
    #[must_use]
    pub fn transactions(&self) -> Vec<OccTransaction> {
        self.transactions
            .iter()
            .map(|t| {
                let queries = t.operations.iter().map(OperationSpec::to_query).collect();
                OccTransaction::new(t.id, queries)
            })
            .collect()
    }
}

/// Replay report.
#[derive(Debug, Serialize)]
pub struct OccReport {
    /// Event tokens.
    pub trace: Vec<String>,
    /// Per-transaction results.
    pub transactions: Vec<TransactionReport>,
}

/// Result of one transaction.
#[derive(Debug, Serialize)]
pub struct TransactionReport {
    /// Original id.
    pub id: u64,
    /// Final logical timestamp.
    pub timestamp: u64,
    /// `committed` or `incomplete`.
    pub status: &'static str,
    /// End timestamp when committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<u64>,
    /// Number of rollbacks.
    pub rollbacks: usize,
    /// Display renderings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub displays: Vec<String>,
}

impl From<&OccOutcome> for OccReport {
    fn from(outcome: &OccOutcome) -> Self {
        Self {
            trace: outcome.tokens(),
            transactions: outcome
                .transactions
                .iter()
                .map(|t| {
                    let (status, end_timestamp) = match t.status {
                        OutcomeStatus::Committed { end_timestamp } => {
                            ("committed", Some(end_timestamp.as_u64()))
                        }
                        OutcomeStatus::Incomplete => ("incomplete", None),
                    };
                    TransactionReport {
                        id: t.id.as_u64(),
                        timestamp: t.timestamp.as_u64(),
                        status,
                        end_timestamp,
                        rollbacks: t.rollbacks,
                        displays: t.displays.clone(),
                    }
                })
                .collect(),
        }
    }
}

/// Replays `scenario`, optionally applying committed work to a file store.
pub fn replay(
    scenario: &Scenario,
    store: Option<&Path>,
    config: OccConfig,
) -> Result<OccOutcome, Box<dyn std::error::Error>> {
    let mut driver = OccDriver::new(scenario.transactions(), scenario.schedule.clone(), config)?;
    let outcome = match store {
        Some(path) => {
            let mut store = FileStore::open(path)?;
            driver.run_with_store(&mut store)?
        }
        None => driver.run()?,
    };
    Ok(outcome)
}

/// Runs the occ command.
pub fn run(
    scenario: Scenario,
    store: Option<&Path>,
    max_rollbacks: Option<usize>,
    verbose: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = OccConfig::new().verbose(verbose);
    if let Some(limit) = max_rollbacks {
        config = config.max_rollbacks(limit);
    }
    let outcome = replay(&scenario, store, config)?;
    let report = OccReport::from(&outcome);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &OccReport) {
    println!("Optimistic Concurrency Control Replay");
    println!("=====================================");
    println!();
    println!("Trace: {}", report.trace.join(", "));
    println!();
    println!("Transactions:");
    for t in &report.transactions {
        match t.end_timestamp {
            Some(end) => println!(
                "  T{}: {} as T{} (end {}), {} rollbacks",
                t.id, t.status, t.timestamp, end, t.rollbacks
            ),
            None => println!(
                "  T{}: {} as T{}, {} rollbacks",
                t.id, t.status, t.timestamp, t.rollbacks
            ),
        }
        for line in &t.displays {
            println!("    {line}");
        }
    }
}
