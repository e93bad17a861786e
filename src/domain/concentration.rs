//! Herfindahl concentration indices over sector, region and currency.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::holding::{AssetClass, Holding, KNOWN_SECTORS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sector,
    Region,
    Currency,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Sector, Dimension::Region, Dimension::Currency];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Dimension::Sector => "sector",
            Dimension::Region => "region",
            Dimension::Currency => "currency",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sector" => Ok(Dimension::Sector),
            "region" => Ok(Dimension::Region),
            "currency" => Ok(Dimension::Currency),
            other => Err(format!("unknown dimension '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationLevel {
    Diversified,
    Moderate,
    Concentrated,
}

impl ConcentrationLevel {
    pub fn from_hhi(hhi: f64) -> Self {
        if hhi > 0.50 {
            ConcentrationLevel::Concentrated
        } else if hhi >= 0.25 {
            ConcentrationLevel::Moderate
        } else {
            ConcentrationLevel::Diversified
        }
    }
}

/// Group key of a holding in a dimension; `None` when the holding does not
/// participate (cash in sector/region).
pub fn group_key(holding: &Holding, dimension: Dimension) -> Option<String> {
    match dimension {
        Dimension::Currency => Some(holding.currency.clone()),
        Dimension::Sector => match holding.asset_class {
            AssetClass::Cash => None,
            AssetClass::Etf(backing) => Some(format!("ETF ({backing})")),
            AssetClass::Equity | AssetClass::Unknown => {
                Some(holding.sector.clone().unwrap_or_else(|| "Unknown".to_string()))
            }
        },
        Dimension::Region => match holding.asset_class {
            AssetClass::Cash => None,
            _ => Some(holding.region.clone().unwrap_or_else(|| "Unknown".to_string())),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationIndex {
    pub dimension: Dimension,
    pub hhi: f64,
    pub level: ConcentrationLevel,
    /// Group → share of the participating weight (sums to one).
    pub breakdown: BTreeMap<String, f64>,
}

impl ConcentrationIndex {
    /// HHI over `(holding, weight)` pairs. `None` when no holding participates
    /// in the dimension or all participating weights are zero.
    pub fn compute(weighted: &[(&Holding, f64)], dimension: Dimension) -> Option<Self> {
        let mut groups: BTreeMap<String, f64> = BTreeMap::new();
        for (holding, weight) in weighted {
            if let Some(key) = group_key(holding, dimension) {
                *groups.entry(key).or_insert(0.0) += weight.max(0.0);
            }
        }

        let total: f64 = groups.values().sum();
        if groups.is_empty() || total <= 0.0 {
            return None;
        }

        let breakdown: BTreeMap<String, f64> = groups
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(k, w)| (k, w / total))
            .collect();
        let hhi = breakdown.values().map(|s| s * s).sum::<f64>().clamp(0.0, 1.0);

        Some(ConcentrationIndex {
            dimension,
            hhi,
            level: ConcentrationLevel::from_hhi(hhi),
            breakdown,
        })
    }

    /// Known sectors with no weight in this breakdown, in catalog order.
    /// Empty for the region and currency dimensions.
    pub fn missing_sectors(&self) -> Vec<String> {
        if self.dimension != Dimension::Sector {
            return Vec::new();
        }
        KNOWN_SECTORS
            .iter()
            .filter(|s| !self.breakdown.contains_key(**s))
            .map(|s| s.to_string())
            .collect()
    }

    /// Largest group; ties go to the alphabetically first group.
    pub fn dominant_group(&self) -> Option<(&str, f64)> {
        self.breakdown
            .iter()
            .fold(None, |best: Option<(&str, f64)>, (k, &w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((k.as_str(), w)),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationProfile {
    pub sector: Option<ConcentrationIndex>,
    pub region: Option<ConcentrationIndex>,
    pub currency: Option<ConcentrationIndex>,
}

impl ConcentrationProfile {
    pub fn compute(weighted: &[(&Holding, f64)]) -> Self {
        ConcentrationProfile {
            sector: ConcentrationIndex::compute(weighted, Dimension::Sector),
            region: ConcentrationIndex::compute(weighted, Dimension::Region),
            currency: ConcentrationIndex::compute(weighted, Dimension::Currency),
        }
    }

    pub fn get(&self, dimension: Dimension) -> Option<&ConcentrationIndex> {
        match dimension {
            Dimension::Sector => self.sector.as_ref(),
            Dimension::Region => self.region.as_ref(),
            Dimension::Currency => self.currency.as_ref(),
        }
    }

    pub fn hhi(&self, dimension: Dimension) -> Option<f64> {
        self.get(dimension).map(|i| i.hhi)
    }

    /// Highest index across dimensions, with the dimension it came from.
    pub fn max(&self) -> Option<(Dimension, f64)> {
        Dimension::ALL
            .iter()
            .filter_map(|&d| self.hhi(d).map(|h| (d, h)))
            .fold(None, |best, (d, h)| match best {
                Some((_, bh)) if bh >= h => best,
                _ => Some((d, h)),
            })
    }
}
