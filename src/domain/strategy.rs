//! Rebalancing strategy constraints: named presets plus per-threshold overrides.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::ShockwiseError;

pub const DEFAULT_INCREASE_STEP: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    Defensive,
    Balanced,
    Aggressive,
}

impl StrategyPreset {
    pub const ALL: [StrategyPreset; 3] = [
        StrategyPreset::Defensive,
        StrategyPreset::Balanced,
        StrategyPreset::Aggressive,
    ];
}

impl fmt::Display for StrategyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StrategyPreset::Defensive => "defensive",
            StrategyPreset::Balanced => "balanced",
            StrategyPreset::Aggressive => "aggressive",
        };
        f.write_str(label)
    }
}

impl FromStr for StrategyPreset {
    type Err = ShockwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defensive" => Ok(StrategyPreset::Defensive),
            "balanced" => Ok(StrategyPreset::Balanced),
            "aggressive" => Ok(StrategyPreset::Aggressive),
            _ => Err(ShockwiseError::UnknownStrategy {
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub name: String,
    /// Largest weight any single non-cash holding may carry.
    pub max_position_weight: f64,
    pub max_sector_hhi: f64,
    pub max_region_hhi: f64,
    /// Weight added to a holding by one `increase` action.
    pub increase_step: f64,
}

/// Per-threshold overrides layered on top of a preset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrategyOverrides {
    pub max_position_weight: Option<f64>,
    pub max_sector_hhi: Option<f64>,
    pub max_region_hhi: Option<f64>,
    pub increase_step: Option<f64>,
}

impl StrategyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == StrategyOverrides::default()
    }
}

impl Strategy {
    pub fn preset(preset: StrategyPreset) -> Self {
        let (position, sector, region) = match preset {
            StrategyPreset::Defensive => (0.10, 0.25, 0.40),
            StrategyPreset::Balanced => (0.15, 0.35, 0.55),
            StrategyPreset::Aggressive => (0.25, 0.50, 0.75),
        };
        Strategy {
            name: preset.to_string(),
            max_position_weight: position,
            max_sector_hhi: sector,
            max_region_hhi: region,
            increase_step: DEFAULT_INCREASE_STEP,
        }
    }

    /// Resolve a preset by name and apply overrides, validating the result.
    pub fn resolve(name: &str, overrides: &StrategyOverrides) -> Result<Self, ShockwiseError> {
        let preset: StrategyPreset = name.parse()?;
        Strategy::preset(preset).with_overrides(overrides)
    }

    pub fn with_overrides(mut self, overrides: &StrategyOverrides) -> Result<Self, ShockwiseError> {
        if let Some(v) = overrides.max_position_weight {
            self.max_position_weight = v;
        }
        if let Some(v) = overrides.max_sector_hhi {
            self.max_sector_hhi = v;
        }
        if let Some(v) = overrides.max_region_hhi {
            self.max_region_hhi = v;
        }
        if let Some(v) = overrides.increase_step {
            self.increase_step = v;
        }
        if !overrides.is_empty() {
            self.name = format!("{} (custom)", self.name);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ShockwiseError> {
        check_fraction("max_position_weight", self.max_position_weight, false)?;
        check_fraction("max_sector_hhi", self.max_sector_hhi, false)?;
        check_fraction("max_region_hhi", self.max_region_hhi, false)?;
        check_fraction("increase_step", self.increase_step, true)?;
        Ok(())
    }
}

fn check_fraction(field: &str, value: f64, allow_zero: bool) -> Result<(), ShockwiseError> {
    let invalid = |reason: String| ShockwiseError::InvalidStrategy {
        field: field.to_string(),
        reason,
    };
    if !value.is_finite() {
        return Err(invalid(format!("{value} is not a number")));
    }
    if value < 0.0 {
        return Err(invalid(format!("{value} is negative")));
    }
    if value == 0.0 && !allow_zero {
        return Err(invalid("must be greater than zero".into()));
    }
    if value > 1.0 {
        return Err(invalid(format!("{value} exceeds 1.0")));
    }
    Ok(())
}
