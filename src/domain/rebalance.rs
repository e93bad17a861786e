//! Rebalance planning: current allocation, proposed actions and the
//! projected allocation they lead to.
//!
//! Constraints the actions cannot fix are listed as residual violations so a
//! partial plan is never mistaken for a complete one.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::concentration::{ConcentrationProfile, Dimension};
use crate::domain::error::ShockwiseError;
use crate::domain::portfolio::{Portfolio, WEIGHT_TOLERANCE};
use crate::domain::recommender::{
    project, reweight, Action, ActionKind, HoldingSignals, Recommender, ReductionRequest,
};
use crate::domain::scenario_analysis::{ScenarioReport, StressFlag};
use crate::domain::strategy::Strategy;
use crate::ports::signal_port::{HealthPort, ReturnEstimatePort};

/// HHI increase that counts as a plan making concentration worse.
pub const HHI_WORSENING_MARGIN: f64 = 0.01;

/// Allocation row that holds sale proceeds when every holding is sold.
pub const PROCEEDS_SYMBOL: &str = "CASH";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRow {
    pub symbol: String,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationComparison {
    pub dimension: Dimension,
    pub before: Option<f64>,
    pub after: Option<f64>,
    pub cap: Option<f64>,
}

impl ConcentrationComparison {
    pub fn worsened(&self) -> bool {
        match (self.before, self.after) {
            (Some(before), Some(after)) => after > before + HHI_WORSENING_MARGIN,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResidualViolation {
    PositionOverCap {
        symbol: String,
        weight: f64,
        cap: f64,
    },
    ConcentrationOverCap {
        dimension: Dimension,
        hhi: f64,
        cap: f64,
    },
    /// Every holding is sold; the projection is all proceeds.
    FullyLiquidated {
        holdings: usize,
    },
}

impl std::fmt::Display for ResidualViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResidualViolation::PositionOverCap {
                symbol,
                weight,
                cap,
            } => write!(
                f,
                "{symbol} still at {:.1}% (cap {:.1}%)",
                weight * 100.0,
                cap * 100.0
            ),
            ResidualViolation::ConcentrationOverCap {
                dimension,
                hhi,
                cap,
            } => write!(f, "{dimension} HHI still {hhi:.3} (cap {cap:.3})"),
            ResidualViolation::FullyLiquidated { holdings } => write!(
                f,
                "all {holdings} holdings sold; proceeds held as {PROCEEDS_SYMBOL}"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanJudgment {
    Recommend,
    Caution,
    NotRecommended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalancePlan {
    pub strategy: Strategy,
    /// Scenario whose per-holding shocks fed the sell rule, if any.
    pub scenario: Option<String>,
    pub actions: Vec<Action>,
    pub allocation: Vec<AllocationRow>,
    pub concentration: Vec<ConcentrationComparison>,
    pub violations: Vec<ResidualViolation>,
    /// Holdings the baseline scenario hits beyond the stress threshold.
    pub stressed: Vec<StressFlag>,
    /// Sectors absent from a portfolio whose sector HHI is over the cap.
    pub diversify_into: Vec<String>,
    pub judgment: PlanJudgment,
}

/// Builds plans from a portfolio plus health and return-estimate collaborators.
pub struct Rebalancer<'a> {
    health: &'a dyn HealthPort,
    estimates: &'a dyn ReturnEstimatePort,
}

impl<'a> Rebalancer<'a> {
    pub fn new(health: &'a dyn HealthPort, estimates: &'a dyn ReturnEstimatePort) -> Self {
        Rebalancer { health, estimates }
    }

    pub fn plan(
        &self,
        portfolio: &Portfolio,
        strategy: &Strategy,
        baseline: Option<&ScenarioReport>,
        requests: &[ReductionRequest],
    ) -> Result<RebalancePlan, ShockwiseError> {
        strategy.validate()?;
        let weighted = portfolio.weighted()?;
        let weights: BTreeMap<String, f64> = weighted
            .iter()
            .map(|(h, w)| (h.symbol.clone(), *w))
            .collect();

        tracing::info!(
            strategy = %strategy.name,
            holdings = weighted.len(),
            scenario = baseline.map(|r| r.scenario.as_str()),
            "planning rebalance"
        );

        let shocks = baseline.map(ScenarioReport::shocks).unwrap_or_default();
        let signals: BTreeMap<String, HoldingSignals> = weighted
            .iter()
            .map(|(h, _)| {
                let s = HoldingSignals {
                    health: self.health.health(&h.symbol),
                    scenario_impact: shocks.get(&h.symbol).copied(),
                    estimate: self.estimates.estimate(&h.symbol),
                };
                (h.symbol.clone(), s)
            })
            .collect();

        let actions = Recommender::new(strategy).recommend(&weighted, &signals, requests);

        let projected = project(&weights, &actions);
        let after_weighted = reweight(&weighted, &projected);

        let before_profile = ConcentrationProfile::compute(&weighted);
        let after_profile = ConcentrationProfile::compute(&after_weighted);

        let liquidated = projected.values().all(|w| *w <= WEIGHT_TOLERANCE);

        let mut allocation: Vec<AllocationRow> = weighted
            .iter()
            .map(|(h, w)| AllocationRow {
                symbol: h.symbol.clone(),
                before: *w,
                after: projected.get(&h.symbol).copied().unwrap_or(0.0),
            })
            .collect();
        if liquidated {
            allocation.push(AllocationRow {
                symbol: PROCEEDS_SYMBOL.to_string(),
                before: 0.0,
                after: 1.0,
            });
        }

        let concentration: Vec<ConcentrationComparison> = Dimension::ALL
            .iter()
            .map(|&dimension| ConcentrationComparison {
                dimension,
                before: before_profile.hhi(dimension),
                after: after_profile.hhi(dimension),
                cap: hhi_cap(strategy, dimension),
            })
            .collect();

        let mut violations: Vec<ResidualViolation> = after_weighted
            .iter()
            .filter(|(h, w)| {
                !h.asset_class.is_cash() && *w > strategy.max_position_weight + WEIGHT_TOLERANCE
            })
            .map(|(h, w)| ResidualViolation::PositionOverCap {
                symbol: h.symbol.clone(),
                weight: *w,
                cap: strategy.max_position_weight,
            })
            .collect();
        violations.extend(concentration.iter().filter_map(|c| {
            let (hhi, cap) = (c.after?, c.cap?);
            (hhi > cap + WEIGHT_TOLERANCE).then_some(ResidualViolation::ConcentrationOverCap {
                dimension: c.dimension,
                hhi,
                cap,
            })
        }));

        if liquidated {
            violations.push(ResidualViolation::FullyLiquidated {
                holdings: weighted.len(),
            });
        }

        for v in &violations {
            tracing::warn!(violation = %v, "constraint still violated after plan");
        }

        let judgment = judge(&concentration, &violations, &actions, &signals);

        let diversify_into = before_profile
            .sector
            .as_ref()
            .filter(|s| s.hhi > strategy.max_sector_hhi + WEIGHT_TOLERANCE)
            .map(|s| s.missing_sectors())
            .unwrap_or_default();
        let stressed = baseline.map(|r| r.stressed.clone()).unwrap_or_default();

        Ok(RebalancePlan {
            strategy: strategy.clone(),
            scenario: baseline.map(|r| r.scenario.clone()),
            actions,
            allocation,
            concentration,
            violations,
            stressed,
            diversify_into,
            judgment,
        })
    }
}

fn hhi_cap(strategy: &Strategy, dimension: Dimension) -> Option<f64> {
    match dimension {
        Dimension::Sector => Some(strategy.max_sector_hhi),
        Dimension::Region => Some(strategy.max_region_hhi),
        Dimension::Currency => None,
    }
}

fn judge(
    concentration: &[ConcentrationComparison],
    violations: &[ResidualViolation],
    actions: &[Action],
    signals: &BTreeMap<String, HoldingSignals>,
) -> PlanJudgment {
    let worsened = |dimension: Dimension| {
        concentration
            .iter()
            .any(|c| c.dimension == dimension && c.worsened())
    };
    if worsened(Dimension::Sector) && worsened(Dimension::Region) {
        return PlanJudgment::NotRecommended;
    }

    let risky_increase = actions.iter().any(|a| {
        a.kind == ActionKind::Increase
            && signals
                .get(&a.symbol)
                .and_then(|s| s.health)
                .is_some_and(|h| h.is_warning())
    });
    if !violations.is_empty() || risky_increase {
        return PlanJudgment::Caution;
    }
    PlanJudgment::Recommend
}
