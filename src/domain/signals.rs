//! Health and expected-return signals supplied by collaborators.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    EarlyWarning,
    Caution,
    Exit,
}

impl HealthStatus {
    /// Statuses that should make a reader hesitate before adding to a position.
    pub fn is_warning(self) -> bool {
        matches!(self, HealthStatus::EarlyWarning | HealthStatus::Caution)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::EarlyWarning => "early_warning",
            HealthStatus::Caution => "caution",
            HealthStatus::Exit => "exit",
        };
        f.write_str(label)
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "healthy" | "ok" => Ok(HealthStatus::Healthy),
            "early_warning" | "warning" => Ok(HealthStatus::EarlyWarning),
            "caution" => Ok(HealthStatus::Caution),
            "exit" => Ok(HealthStatus::Exit),
            other => Err(format!("unknown health status '{other}'")),
        }
    }
}

/// Optimistic / base / pessimistic annual return estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnEstimate {
    pub optimistic: f64,
    pub base: f64,
    pub pessimistic: f64,
}

impl ReturnEstimate {
    pub fn is_positive(&self) -> bool {
        self.base > 0.0
    }
}
