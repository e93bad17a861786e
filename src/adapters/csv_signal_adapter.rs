//! CSV-backed health and return-estimate signals.
//!
//! Health file: `symbol,status`. Estimates file:
//! `symbol,optimistic,base,pessimistic`. Either file may be omitted, in which
//! case every symbol reports no signal.

use crate::domain::error::ShockwiseError;
use crate::domain::signals::{HealthStatus, ReturnEstimate};
use crate::ports::signal_port::{HealthPort, ReturnEstimatePort};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CsvSignalAdapter {
    health: BTreeMap<String, HealthStatus>,
    estimates: BTreeMap<String, ReturnEstimate>,
}

#[derive(Debug, Deserialize)]
struct HealthRow {
    symbol: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct EstimateRow {
    symbol: String,
    optimistic: f64,
    base: f64,
    pessimistic: f64,
}

impl CsvSignalAdapter {
    pub fn load(health: Option<&Path>, estimates: Option<&Path>) -> Result<Self, ShockwiseError> {
        let mut adapter = CsvSignalAdapter::default();

        if let Some(path) = health {
            for row in read_rows::<HealthRow>(path)? {
                let status = row.status.parse::<HealthStatus>().map_err(|reason| {
                    ShockwiseError::Data {
                        reason: format!("{}: {}: {}", path.display(), row.symbol, reason),
                    }
                })?;
                adapter.health.insert(row.symbol, status);
            }
        }

        if let Some(path) = estimates {
            for row in read_rows::<EstimateRow>(path)? {
                adapter.estimates.insert(
                    row.symbol,
                    ReturnEstimate {
                        optimistic: row.optimistic,
                        base: row.base,
                        pessimistic: row.pessimistic,
                    },
                );
            }
        }

        tracing::debug!(
            health = adapter.health.len(),
            estimates = adapter.estimates.len(),
            "signals loaded"
        );
        Ok(adapter)
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ShockwiseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ShockwiseError::Data {
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;
    let rows = rdr
        .deserialize()
        .map(|r| {
            r.map_err(|e| ShockwiseError::Data {
                reason: format!("{}: {}", path.display(), e),
            })
        })
        .collect();
    rows
}

impl HealthPort for CsvSignalAdapter {
    fn health(&self, symbol: &str) -> Option<HealthStatus> {
        self.health.get(symbol).copied()
    }
}

impl ReturnEstimatePort for CsvSignalAdapter {
    fn estimate(&self, symbol: &str) -> Option<ReturnEstimate> {
        self.estimates.get(symbol).copied()
    }
}
