//! Static catalog of named macro scenarios and free-text name resolution.
//!
//! A scenario is a list of target rules, each pairing a [`Selector`] with a
//! shock expressed as a fractional price move (`-0.15` is a 15% fall), plus
//! a baseline shock for holdings no rule reaches.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::error::ShockwiseError;
use crate::domain::holding::{DemandProfile, EtfBacking};
use crate::domain::sensitivity::RiskFactor;

pub const CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Selector {
    Region(String),
    Currency(String),
    Demand(DemandProfile),
    EtfBacking(EtfBacking),
    NonTechnology,
    Sector(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Region(r) => write!(f, "region={r}"),
            Selector::Currency(c) => write!(f, "currency={c}"),
            Selector::Demand(d) => write!(f, "demand={d}"),
            Selector::EtfBacking(b) => write!(f, "etf={b}"),
            Selector::NonTechnology => f.write_str("non-technology"),
            Selector::Sector(s) => write!(f, "sector={s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRule {
    pub selector: Selector,
    pub shock: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub label: String,
    pub aliases: Vec<String>,
    pub rules: Vec<TargetRule>,
    pub baseline_shock: f64,
    pub driver: RiskFactor,
}

/// Immutable, versioned set of scenarios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioCatalog {
    version: u32,
    scenarios: Vec<ScenarioDefinition>,
}

struct Builder {
    def: ScenarioDefinition,
}

impl Builder {
    fn new(name: &str, label: &str, driver: RiskFactor, baseline_shock: f64) -> Self {
        Builder {
            def: ScenarioDefinition {
                name: name.to_string(),
                label: label.to_string(),
                aliases: Vec::new(),
                rules: Vec::new(),
                baseline_shock,
                driver,
            },
        }
    }

    fn aliases(mut self, aliases: &[&str]) -> Self {
        self.def.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    fn rule(mut self, selector: Selector, shock: f64) -> Self {
        self.def.rules.push(TargetRule { selector, shock });
        self
    }

    fn region(self, region: &str, shock: f64) -> Self {
        self.rule(Selector::Region(region.to_string()), shock)
    }

    fn currency(self, currency: &str, shock: f64) -> Self {
        self.rule(Selector::Currency(currency.to_string()), shock)
    }

    fn sector(self, sector: &str, shock: f64) -> Self {
        self.rule(Selector::Sector(sector.to_string()), shock)
    }

    fn build(self) -> ScenarioDefinition {
        self.def
    }
}

fn builtin_scenarios() -> Vec<ScenarioDefinition> {
    use DemandProfile::*;
    use EtfBacking::*;
    use RiskFactor::*;

    vec![
        Builder::new(
            "japan_triple_decline",
            "Japan triple decline (equities, JGBs and yen fall together)",
            Currency,
            -0.05,
        )
        .aliases(&["triple decline", "トリプル安", "japan crash"])
        .region("JP", -0.20)
        .currency("JPY", -0.10)
        .rule(Selector::EtfBacking(LongBond), -0.08)
        .rule(Selector::EtfBacking(Gold), 0.05)
        .build(),
        Builder::new(
            "dollar_strength",
            "Dollar strength / yen weakness",
            Currency,
            -0.02,
        )
        .aliases(&["dollar strength", "strong dollar", "yen weakness", "円安"])
        .currency("USD", 0.08)
        .rule(Selector::Demand(ExportOriented), 0.05)
        .rule(Selector::Demand(DomesticDemand), -0.03)
        .rule(Selector::EtfBacking(Gold), -0.05)
        .build(),
        Builder::new("us_recession", "US recession", SectorDrawdown, -0.08)
            .aliases(&["us recession", "recession", "米国景気後退"])
            .region("US", -0.25)
            .rule(Selector::Demand(ExportOriented), -0.15)
            .rule(Selector::EtfBacking(LongBond), 0.10)
            .rule(Selector::EtfBacking(Gold), 0.05)
            .rule(Selector::NonTechnology, -0.10)
            .build(),
        Builder::new("rate_hike", "Central-bank rate hike", InterestRate, -0.03)
            .aliases(&["rate hike", "tightening", "利上げ"])
            .rule(Selector::EtfBacking(LongBond), -0.15)
            .sector("Real Estate", -0.12)
            .sector("Technology", -0.10)
            .sector("Utilities", -0.08)
            .sector("Financial Services", 0.03)
            .build(),
        Builder::new(
            "geopolitical_conflict",
            "Geopolitical conflict",
            SectorDrawdown,
            -0.07,
        )
        .aliases(&["geopolitical", "military conflict", "地政学"])
        .region("KR", -0.15)
        .region("HK", -0.15)
        .rule(Selector::EtfBacking(Gold), 0.10)
        .rule(Selector::EtfBacking(Commodity), 0.08)
        .sector("Energy", 0.05)
        .sector("Industrials", -0.10)
        .build(),
        Builder::new(
            "inflation_resurgence",
            "Inflation resurgence",
            InterestRate,
            -0.05,
        )
        .aliases(&["inflation", "インフレ"])
        .rule(Selector::EtfBacking(LongBond), -0.12)
        .rule(Selector::EtfBacking(Commodity), 0.10)
        .rule(Selector::EtfBacking(Gold), 0.06)
        .sector("Technology", -0.12)
        .sector("Energy", 0.08)
        .sector("Basic Materials", 0.04)
        .sector("Consumer Defensive", -0.04)
        .build(),
        Builder::new("tech_crash", "Technology sector crash", SectorDrawdown, -0.08)
            .aliases(&["tech crash", "technology crash", "ハイテク暴落"])
            .rule(Selector::EtfBacking(LongBond), 0.05)
            .rule(Selector::EtfBacking(Gold), 0.03)
            .rule(Selector::NonTechnology, -0.05)
            .sector("Technology", -0.30)
            .sector("Communication Services", -0.20)
            .build(),
        Builder::new(
            "yen_strength",
            "Yen strength / dollar weakness",
            Currency,
            -0.02,
        )
        .aliases(&["yen strength", "strong yen", "dollar weakness", "円高"])
        .currency("USD", -0.10)
        .currency("SGD", -0.06)
        .currency("HKD", -0.06)
        .rule(Selector::Demand(ExportOriented), -0.12)
        .rule(Selector::Demand(DomesticDemand), 0.03)
        .rule(Selector::EtfBacking(Gold), 0.02)
        .build(),
    ]
}

impl ScenarioCatalog {
    /// Validates that every canonical name and alias is non-empty and unique
    /// across the whole catalog.
    pub fn new(version: u32, scenarios: Vec<ScenarioDefinition>) -> Result<Self, ShockwiseError> {
        let mut seen = BTreeSet::new();
        for def in &scenarios {
            for key in std::iter::once(&def.name).chain(def.aliases.iter()) {
                if key.trim().is_empty() {
                    return Err(ShockwiseError::InvalidCatalog {
                        reason: format!("scenario '{}' has an empty name or alias", def.name),
                    });
                }
                if !seen.insert(key.as_str()) {
                    return Err(ShockwiseError::InvalidCatalog {
                        reason: format!("'{key}' is declared more than once"),
                    });
                }
            }
            if !def.baseline_shock.is_finite() || def.rules.iter().any(|r| !r.shock.is_finite()) {
                return Err(ShockwiseError::InvalidCatalog {
                    reason: format!("scenario '{}' has a non-finite shock", def.name),
                });
            }
        }
        Ok(ScenarioCatalog { version, scenarios })
    }

    /// The eight scenarios that ship with the engine.
    pub fn builtin() -> Result<Self, ShockwiseError> {
        ScenarioCatalog::new(CATALOG_VERSION, builtin_scenarios())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn scenarios(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioDefinition> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Resolve free text to a scenario. Exact (case-sensitive) matches on
    /// names and aliases win; otherwise the first declared name or alias
    /// contained in the input.
    pub fn resolve(&self, input: &str) -> Result<&ScenarioDefinition, ShockwiseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ShockwiseError::UnknownScenario {
                name: String::new(),
            });
        }

        let keys = || {
            self.scenarios.iter().flat_map(|def| {
                std::iter::once(def.name.as_str())
                    .chain(def.aliases.iter().map(String::as_str))
                    .map(move |key| (key, def))
            })
        };

        if let Some((_, def)) = keys().find(|(key, _)| *key == input) {
            return Ok(def);
        }
        if let Some((key, def)) = keys().find(|(key, _)| input.contains(key)) {
            tracing::debug!(%input, alias = key, scenario = %def.name, "scenario resolved by substring");
            return Ok(def);
        }

        Err(ShockwiseError::UnknownScenario {
            name: input.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_passes_validation() {
        let builtin = ScenarioCatalog::builtin().unwrap();
        assert_eq!(builtin.scenarios().len(), 8);
        assert_eq!(builtin.version(), CATALOG_VERSION);
    }

    #[test]
    fn canonical_names() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let names: Vec<&str> = catalog.scenarios().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "japan_triple_decline",
                "dollar_strength",
                "us_recession",
                "rate_hike",
                "geopolitical_conflict",
                "inflation_resurgence",
                "tech_crash",
                "yen_strength",
            ]
        );
    }

    #[test]
    fn resolve_exact_and_alias() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        assert_eq!(catalog.resolve("rate_hike").unwrap().name, "rate_hike");
        assert_eq!(catalog.resolve("利上げ").unwrap().name, "rate_hike");
        assert_eq!(catalog.resolve("円高").unwrap().name, "yen_strength");
    }

    #[test]
    fn resolve_is_case_sensitive_on_exact_pass() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let err = catalog.resolve("RATE HIKE").unwrap_err();
        assert!(matches!(err, ShockwiseError::UnknownScenario { .. }));
    }

    #[test]
    fn resolve_by_substring() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        assert_eq!(
            catalog.resolve("what if a tech crash hits").unwrap().name,
            "tech_crash"
        );
        assert_eq!(catalog.resolve("インフレ再燃").unwrap().name, "inflation_resurgence");
    }

    #[test]
    fn unknown_and_empty_inputs_are_errors() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        assert!(matches!(
            catalog.resolve("alien invasion"),
            Err(ShockwiseError::UnknownScenario { .. })
        ));
        assert!(matches!(
            catalog.resolve("   "),
            Err(ShockwiseError::UnknownScenario { .. })
        ));
    }

    #[test]
    fn duplicate_alias_rejected() {
        let mut scenarios = ScenarioCatalog::builtin().unwrap().scenarios().to_vec();
        scenarios[1].aliases.push("triple decline".into());
        let err = ScenarioCatalog::new(1, scenarios).unwrap_err();
        assert!(matches!(err, ShockwiseError::InvalidCatalog { .. }));
    }

    #[test]
    fn selector_display() {
        assert_eq!(Selector::Region("JP".into()).to_string(), "region=JP");
        assert_eq!(Selector::EtfBacking(EtfBacking::LongBond).to_string(), "etf=Long Bond");
    }
}
