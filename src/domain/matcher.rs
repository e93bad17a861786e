//! Priority chain deciding which scenario rule applies to a holding.
//!
//! Stages are evaluated in [`PRIORITY_CHAIN`] order and the first stage with
//! a matching rule wins; within a stage rules are tried in the order the
//! scenario declares them. A holding reached by no rule takes the scenario's
//! baseline shock.

use serde::Serialize;
use std::fmt;

use crate::domain::holding::{AssetClass, DemandProfile, Holding};
use crate::domain::scenario::{ScenarioDefinition, Selector, TargetRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Region,
    Currency,
    Demand,
    EtfAssetClass,
    NonTechnology,
    Sector,
    Baseline,
    Custom,
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchStage::Region => "region",
            MatchStage::Currency => "currency",
            MatchStage::Demand => "demand",
            MatchStage::EtfAssetClass => "etf asset class",
            MatchStage::NonTechnology => "non-technology",
            MatchStage::Sector => "sector",
            MatchStage::Baseline => "baseline",
            MatchStage::Custom => "custom",
        };
        f.write_str(label)
    }
}

type Predicate = fn(&Selector, &Holding) -> bool;

/// Ordered stage table. Reordering entries changes results.
pub const PRIORITY_CHAIN: &[(MatchStage, Predicate)] = &[
    (MatchStage::Region, matches_region),
    (MatchStage::Currency, matches_currency),
    (MatchStage::Demand, matches_demand),
    (MatchStage::EtfAssetClass, matches_etf_asset_class),
    (MatchStage::NonTechnology, matches_non_technology),
    (MatchStage::Sector, matches_sector),
];

fn matches_region(selector: &Selector, holding: &Holding) -> bool {
    match selector {
        Selector::Region(region) => holding
            .region
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(region)),
        _ => false,
    }
}

fn matches_currency(selector: &Selector, holding: &Holding) -> bool {
    match selector {
        Selector::Currency(currency) => holding.currency.eq_ignore_ascii_case(currency),
        _ => false,
    }
}

fn matches_demand(selector: &Selector, holding: &Holding) -> bool {
    match selector {
        Selector::Demand(DemandProfile::Unclassified) => false,
        Selector::Demand(profile) => holding.demand == *profile,
        _ => false,
    }
}

fn matches_etf_asset_class(selector: &Selector, holding: &Holding) -> bool {
    match selector {
        Selector::EtfBacking(backing) => holding.asset_class.non_equity_backing() == Some(*backing),
        _ => false,
    }
}

fn matches_non_technology(selector: &Selector, holding: &Holding) -> bool {
    matches!(selector, Selector::NonTechnology)
        && holding.asset_class == AssetClass::Equity
        && holding.sector.is_some()
        && !holding.is_technology()
}

fn matches_sector(selector: &Selector, holding: &Holding) -> bool {
    match selector {
        Selector::Sector(sector) => holding
            .sector
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(sector)),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub symbol: String,
    pub scenario: String,
    pub stage: MatchStage,
    /// The rule that fired; `None` for baseline and custom shocks.
    pub rule: Option<TargetRule>,
    pub shock: f64,
}

pub fn match_holding(holding: &Holding, scenario: &ScenarioDefinition) -> MatchResult {
    for (stage, predicate) in PRIORITY_CHAIN {
        if let Some(rule) = scenario
            .rules
            .iter()
            .find(|rule| predicate(&rule.selector, holding))
        {
            return MatchResult {
                symbol: holding.symbol.clone(),
                scenario: scenario.name.clone(),
                stage: *stage,
                rule: Some(rule.clone()),
                shock: rule.shock,
            };
        }
    }

    MatchResult {
        symbol: holding.symbol.clone(),
        scenario: scenario.name.clone(),
        stage: MatchStage::Baseline,
        rule: None,
        shock: scenario.baseline_shock,
    }
}

pub fn match_all<'a>(
    holdings: impl IntoIterator<Item = &'a Holding>,
    scenario: &ScenarioDefinition,
) -> Vec<MatchResult> {
    holdings
        .into_iter()
        .map(|h| match_holding(h, scenario))
        .collect()
}
