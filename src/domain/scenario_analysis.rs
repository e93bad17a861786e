//! Applying a scenario to a portfolio.
//!
//! Each holding's matched shock is weighted into a portfolio-level impact.
//! Holdings strongly correlated with a heavily shocked holding are flagged
//! as contagion candidates even when their own direct shock is mild.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::correlation::CorrelationMatrix;
use crate::domain::error::ShockwiseError;
use crate::domain::matcher::{match_holding, MatchResult, MatchStage};
use crate::domain::portfolio::Portfolio;
use crate::domain::scenario::ScenarioCatalog;
use crate::domain::sensitivity::{RiskFactor, SensitivityProfile};

pub const DEFAULT_CONTAGION_THRESHOLD: f64 = 0.7;
pub const DEFAULT_HEAVY_SHOCK: f64 = -0.15;

const MONITOR_THRESHOLD: f64 = -0.10;
const ACT_THRESHOLD: f64 = -0.30;

/// A holding shocked below this is flagged individually.
pub const STRESS_FLAG_SHOCK: f64 = -0.30;

/// Which scenario to run.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioSpec {
    /// Canonical name, alias or free text containing an alias.
    Named(String),
    /// One shock applied to every holding.
    Custom { label: String, shock: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub contagion_threshold: f64,
    pub heavy_shock: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            contagion_threshold: DEFAULT_CONTAGION_THRESHOLD,
            heavy_shock: DEFAULT_HEAVY_SHOCK,
        }
    }
}

/// Optional evidence that enriches the report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evidence<'a> {
    pub correlations: Option<&'a CorrelationMatrix>,
    pub sensitivities: Option<&'a BTreeMap<String, SensitivityProfile>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioJudgment {
    Continue,
    Monitor,
    Act,
}

impl ScenarioJudgment {
    pub fn from_impact(impact: f64) -> Self {
        if impact < ACT_THRESHOLD {
            ScenarioJudgment::Act
        } else if impact < MONITOR_THRESHOLD {
            ScenarioJudgment::Monitor
        } else {
            ScenarioJudgment::Continue
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingImpact {
    pub symbol: String,
    pub weight: f64,
    pub market_value: f64,
    pub shock: f64,
    pub stage: MatchStage,
    /// Selector of the rule that fired, e.g. `region=JP`.
    pub rule: Option<String>,
    pub contribution: f64,
    pub value_change: f64,
    /// Sensitivity to the scenario's driving factor, when it was scored.
    pub driver_sensitivity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContagionNote {
    pub symbol: String,
    pub source: String,
    pub correlation: f64,
    pub direct_shock: f64,
    pub source_shock: f64,
}

/// Holding whose own shock is severe regardless of the portfolio outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressFlag {
    pub symbol: String,
    pub shock: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub label: String,
    pub catalog_version: Option<u32>,
    pub driver: Option<RiskFactor>,
    pub impacts: Vec<HoldingImpact>,
    pub portfolio_impact: f64,
    pub portfolio_value_change: f64,
    pub judgment: ScenarioJudgment,
    pub worst_hit: Option<String>,
    pub contagion: Vec<ContagionNote>,
    /// Worst first.
    pub stressed: Vec<StressFlag>,
}

impl ScenarioReport {
    /// Direct shock per symbol.
    pub fn shocks(&self) -> BTreeMap<String, f64> {
        self.impacts
            .iter()
            .map(|i| (i.symbol.clone(), i.shock))
            .collect()
    }
}

pub fn analyze(
    catalog: &ScenarioCatalog,
    spec: &ScenarioSpec,
    portfolio: &Portfolio,
    evidence: Evidence<'_>,
    config: &AnalysisConfig,
) -> Result<ScenarioReport, ShockwiseError> {
    let weighted = portfolio.weighted()?;

    let (name, label, catalog_version, driver, matches) = match spec {
        ScenarioSpec::Named(input) => {
            let def = catalog.resolve(input)?;
            let matches: Vec<MatchResult> = weighted
                .iter()
                .map(|(h, _)| match_holding(h, def))
                .collect();
            (
                def.name.clone(),
                def.label.clone(),
                Some(catalog.version()),
                Some(def.driver),
                matches,
            )
        }
        ScenarioSpec::Custom { label, shock } => {
            if !shock.is_finite() || *shock < -1.0 {
                return Err(ShockwiseError::InvalidShock { shock: *shock });
            }
            let matches: Vec<MatchResult> = weighted
                .iter()
                .map(|(h, _)| MatchResult {
                    symbol: h.symbol.clone(),
                    scenario: "custom".to_string(),
                    stage: MatchStage::Custom,
                    rule: None,
                    shock: *shock,
                })
                .collect();
            ("custom".to_string(), label.clone(), None, None, matches)
        }
    };

    tracing::info!(scenario = %name, holdings = weighted.len(), "running scenario analysis");

    let impacts: Vec<HoldingImpact> = weighted
        .iter()
        .zip(&matches)
        .map(|((holding, weight), m)| HoldingImpact {
            symbol: holding.symbol.clone(),
            weight: *weight,
            market_value: holding.market_value,
            shock: m.shock,
            stage: m.stage,
            rule: m.rule.as_ref().map(|r| r.selector.to_string()),
            contribution: weight * m.shock,
            value_change: holding.market_value * m.shock,
            driver_sensitivity: driver.and_then(|factor| {
                evidence
                    .sensitivities?
                    .get(&holding.symbol)
                    .and_then(|p| p.get(factor).score())
            }),
        })
        .collect();

    let portfolio_impact: f64 = impacts.iter().map(|i| i.contribution).sum();
    let portfolio_value_change: f64 = impacts.iter().map(|i| i.value_change).sum();

    let worst_hit = impacts
        .iter()
        .filter(|i| i.shock < 0.0)
        .min_by(|a, b| a.shock.total_cmp(&b.shock).then_with(|| a.symbol.cmp(&b.symbol)))
        .map(|i| i.symbol.clone());

    let contagion = match evidence.correlations {
        Some(matrix) => contagion_notes(&impacts, matrix, config),
        None => Vec::new(),
    };

    let mut stressed: Vec<StressFlag> = impacts
        .iter()
        .filter(|i| i.shock < STRESS_FLAG_SHOCK)
        .map(|i| StressFlag {
            symbol: i.symbol.clone(),
            shock: i.shock,
            weight: i.weight,
        })
        .collect();
    stressed.sort_by(|a, b| a.shock.total_cmp(&b.shock).then_with(|| a.symbol.cmp(&b.symbol)));

    let judgment = ScenarioJudgment::from_impact(portfolio_impact);
    tracing::debug!(
        scenario = %name,
        impact = portfolio_impact,
        ?judgment,
        contagion = contagion.len(),
        stressed = stressed.len(),
        "scenario analysis complete"
    );

    Ok(ScenarioReport {
        scenario: name,
        label,
        catalog_version,
        driver,
        impacts,
        portfolio_impact,
        portfolio_value_change,
        judgment,
        worst_hit,
        contagion,
        stressed,
    })
}

fn contagion_notes(
    impacts: &[HoldingImpact],
    matrix: &CorrelationMatrix,
    config: &AnalysisConfig,
) -> Vec<ContagionNote> {
    let is_heavy = |i: &HoldingImpact| i.shock <= config.heavy_shock;

    let mut notes: Vec<ContagionNote> = impacts
        .iter()
        .filter(|source| is_heavy(source))
        .flat_map(|source| {
            impacts
                .iter()
                .filter(move |other| other.symbol != source.symbol && !is_heavy(other))
                .filter_map(move |other| {
                    let r = matrix.get(&source.symbol, &other.symbol)?.value()?;
                    (r > config.contagion_threshold).then(|| ContagionNote {
                        symbol: other.symbol.clone(),
                        source: source.symbol.clone(),
                        correlation: r,
                        direct_shock: other.shock,
                        source_shock: source.shock,
                    })
                })
        })
        .collect();

    notes.sort_by(|a, b| a.symbol.cmp(&b.symbol).then_with(|| a.source.cmp(&b.source)));
    notes
}
