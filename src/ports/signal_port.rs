//! Per-symbol signal ports. Absence is a value, not an error.

use crate::domain::signals::{HealthStatus, ReturnEstimate};

pub trait HealthPort {
    fn health(&self, symbol: &str) -> Option<HealthStatus>;
}

pub trait ReturnEstimatePort {
    fn estimate(&self, symbol: &str) -> Option<ReturnEstimate>;
}

/// Signal source with nothing to report for any symbol.
pub struct NoSignals;

impl HealthPort for NoSignals {
    fn health(&self, _symbol: &str) -> Option<HealthStatus> {
        None
    }
}

impl ReturnEstimatePort for NoSignals {
    fn estimate(&self, _symbol: &str) -> Option<ReturnEstimate> {
        None
    }
}
