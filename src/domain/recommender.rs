//! Rule engine turning per-holding signals into sell / reduce / increase actions.
//!
//! Sell dominates reduce, and every reduce trigger on one holding collapses
//! into a single action listing all its reasons. A holding with a missing
//! signal simply skips the rule that needs it.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::concentration::{group_key, ConcentrationIndex, Dimension};
use crate::domain::error::ShockwiseError;
use crate::domain::holding::Holding;
use crate::domain::portfolio::{normalize_weights, WEIGHT_TOLERANCE};
use crate::domain::signals::{HealthStatus, ReturnEstimate};
use crate::domain::strategy::Strategy;

/// Direct scenario loss beyond which a holding is sold.
pub const SELL_IMPACT_THRESHOLD: f64 = -0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Sell,
    Reduce,
    Increase,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Sell => "sell",
            ActionKind::Reduce => "reduce",
            ActionKind::Increase => "increase",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Reason {
    ExitSignal,
    ScenarioLoss {
        impact: f64,
    },
    OverPositionCap {
        weight: f64,
        cap: f64,
    },
    ConcentratedGroup {
        dimension: Dimension,
        group: String,
        hhi: f64,
        cap: f64,
    },
    ReductionRequested {
        dimension: Dimension,
        group: String,
        fraction: f64,
    },
    PositiveOutlook {
        base_return: f64,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::ExitSignal => f.write_str("health check signals exit"),
            Reason::ScenarioLoss { impact } => {
                write!(f, "scenario impact {:.1}%", impact * 100.0)
            }
            Reason::OverPositionCap { weight, cap } => write!(
                f,
                "weight {:.1}% exceeds position cap {:.1}%",
                weight * 100.0,
                cap * 100.0
            ),
            Reason::ConcentratedGroup {
                dimension,
                group,
                hhi,
                cap,
            } => write!(
                f,
                "{dimension} HHI {hhi:.3} above cap {cap:.3}, dominated by {group}"
            ),
            Reason::ReductionRequested {
                dimension,
                group,
                fraction,
            } => write!(
                f,
                "requested {:.0}% reduction of {dimension} {group}",
                fraction * 100.0
            ),
            Reason::PositiveOutlook { base_return } => {
                write!(f, "base-case return {:+.1}%", base_return * 100.0)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    pub symbol: String,
    pub reasons: Vec<Reason>,
    /// Portfolio-weight fraction to sell, trim or add.
    pub magnitude: f64,
}

/// Signals collected for one holding. Each is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoldingSignals {
    pub health: Option<HealthStatus>,
    pub scenario_impact: Option<f64>,
    pub estimate: Option<ReturnEstimate>,
}

/// Caller request to cut exposure to one group, e.g. `sector:Technology:0.5`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReductionRequest {
    pub dimension: Dimension,
    pub group: String,
    pub fraction: f64,
}

impl ReductionRequest {
    pub fn new(dimension: Dimension, group: &str, fraction: f64) -> Result<Self, ShockwiseError> {
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
            return Err(ShockwiseError::InvalidStrategy {
                field: "reduction".into(),
                reason: format!("fraction {fraction} must be in (0, 1]"),
            });
        }
        let group = group.trim();
        if group.is_empty() {
            return Err(ShockwiseError::InvalidStrategy {
                field: "reduction".into(),
                reason: "group is empty".into(),
            });
        }
        Ok(ReductionRequest {
            dimension,
            group: group.to_string(),
            fraction,
        })
    }

    fn applies_to(&self, holding: &Holding) -> bool {
        group_key(holding, self.dimension).is_some_and(|g| g.eq_ignore_ascii_case(&self.group))
    }
}

impl FromStr for ReductionRequest {
    type Err = ShockwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ShockwiseError::InvalidStrategy {
            field: "reduction".into(),
            reason: format!("'{s}': {reason}"),
        };
        let mut parts = s.splitn(3, ':');
        let (Some(dim), Some(group), Some(fraction)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected dimension:group:fraction"));
        };
        let dimension: Dimension = dim.parse().map_err(|e: String| invalid(&e))?;
        let fraction: f64 = fraction
            .trim()
            .parse()
            .map_err(|_| invalid("fraction is not a number"))?;
        ReductionRequest::new(dimension, group, fraction)
    }
}

/// Dominant group of an index that is over its cap.
struct ConcentratedGroup {
    dimension: Dimension,
    hhi: f64,
    group: String,
    /// Share of the participating weight.
    share: f64,
    cap: f64,
}

pub struct Recommender<'a> {
    strategy: &'a Strategy,
}

impl<'a> Recommender<'a> {
    pub fn new(strategy: &'a Strategy) -> Self {
        Recommender { strategy }
    }

    pub fn recommend(
        &self,
        weighted: &[(&Holding, f64)],
        signals: &BTreeMap<String, HoldingSignals>,
        requests: &[ReductionRequest],
    ) -> Vec<Action> {
        let no_signals = HoldingSignals::default();

        let concentrated = self.concentrated_groups(weighted);
        let mut actions = Vec::new();

        for &(holding, weight) in weighted {
            let s = signals.get(&holding.symbol).unwrap_or(&no_signals);

            let sell = sell_reasons(s);
            if !sell.is_empty() {
                actions.push(Action {
                    kind: ActionKind::Sell,
                    symbol: holding.symbol.clone(),
                    reasons: sell,
                    magnitude: weight,
                });
                continue;
            }

            let reduce = self.reduce_reasons(holding, weight, &concentrated, requests);
            if !reduce.is_empty() {
                let magnitude = reduce
                    .iter()
                    .map(|(_, m)| *m)
                    .fold(0.0_f64, f64::max)
                    .min(weight);
                actions.push(Action {
                    kind: ActionKind::Reduce,
                    symbol: holding.symbol.clone(),
                    reasons: reduce.into_iter().map(|(r, _)| r).collect(),
                    magnitude,
                });
            }
        }

        let increases = self.increases(weighted, signals, &actions);
        actions.extend(increases);

        sort_actions(&mut actions);
        for action in &actions {
            tracing::debug!(
                kind = %action.kind,
                symbol = %action.symbol,
                magnitude = action.magnitude,
                reasons = action.reasons.len(),
                "action proposed"
            );
        }
        actions
    }

    /// Sector/region indices above their cap.
    fn concentrated_groups(&self, weighted: &[(&Holding, f64)]) -> Vec<ConcentratedGroup> {
        [
            (Dimension::Sector, self.strategy.max_sector_hhi),
            (Dimension::Region, self.strategy.max_region_hhi),
        ]
        .into_iter()
        .filter_map(|(dimension, cap)| {
            let index = ConcentrationIndex::compute(weighted, dimension)?;
            if index.hhi <= cap + WEIGHT_TOLERANCE {
                return None;
            }
            let (group, share) = index.dominant_group()?;
            let group = group.to_string();
            Some(ConcentratedGroup {
                dimension,
                hhi: index.hhi,
                group,
                share,
                cap,
            })
        })
        .collect()
    }

    fn reduce_reasons(
        &self,
        holding: &Holding,
        weight: f64,
        concentrated: &[ConcentratedGroup],
        requests: &[ReductionRequest],
    ) -> Vec<(Reason, f64)> {
        let mut reasons = Vec::new();
        let cap = self.strategy.max_position_weight;

        if !holding.asset_class.is_cash() && weight > cap + WEIGHT_TOLERANCE {
            reasons.push((Reason::OverPositionCap { weight, cap }, weight - cap));
        }

        for c in concentrated {
            if group_key(holding, c.dimension).as_deref() != Some(c.group.as_str()) {
                continue;
            }
            // bring the group down to √cap of the participating weight; if it
            // already sits below that, down to the cap itself
            let target = if c.share > c.cap.sqrt() {
                c.cap.sqrt()
            } else {
                c.cap
            };
            let magnitude = weight * (1.0 - target / c.share).max(0.0);
            reasons.push((
                Reason::ConcentratedGroup {
                    dimension: c.dimension,
                    group: c.group.clone(),
                    hhi: c.hhi,
                    cap: c.cap,
                },
                magnitude,
            ));
        }

        for request in requests.iter().filter(|r| r.applies_to(holding)) {
            reasons.push((
                Reason::ReductionRequested {
                    dimension: request.dimension,
                    group: request.group.clone(),
                    fraction: request.fraction,
                },
                weight * request.fraction,
            ));
        }

        reasons
    }

    /// Increases are accepted one at a time, best base return first, each
    /// sized and checked against the projection that already includes earlier
    /// actions.
    fn increases(
        &self,
        weighted: &[(&Holding, f64)],
        signals: &BTreeMap<String, HoldingSignals>,
        decided: &[Action],
    ) -> Vec<Action> {
        let strategy = self.strategy;
        let mut candidates: Vec<(&Holding, f64)> = weighted
            .iter()
            .filter(|(h, _)| !h.asset_class.is_cash())
            .filter(|(h, _)| !decided.iter().any(|a| a.symbol == h.symbol))
            .filter_map(|&(h, _)| {
                let base = signals.get(&h.symbol)?.estimate?.base;
                (base > 0.0).then_some((h, base))
            })
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.symbol.cmp(&b.0.symbol)));

        let mut projected: BTreeMap<String, f64> = weighted
            .iter()
            .map(|(h, w)| (h.symbol.clone(), *w))
            .collect();
        for action in decided {
            apply_action(&mut projected, action);
        }

        let mut accepted = Vec::new();
        for (holding, base) in candidates {
            let magnitude = strategy
                .increase_step
                .min(increase_headroom(&projected, &holding.symbol, strategy.max_position_weight));
            if magnitude <= WEIGHT_TOLERANCE {
                continue;
            }
            let action = Action {
                kind: ActionKind::Increase,
                symbol: holding.symbol.clone(),
                reasons: vec![Reason::PositiveOutlook { base_return: base }],
                magnitude,
            };

            let mut trial = projected.clone();
            apply_action(&mut trial, &action);
            let trial = normalize_weights(&trial);

            if !self.within_constraints(weighted, &trial, &holding.symbol) {
                tracing::debug!(symbol = %holding.symbol, "increase would breach a cap, skipped");
                continue;
            }
            apply_action(&mut projected, &action);
            accepted.push(action);
        }
        accepted
    }

    fn within_constraints(
        &self,
        weighted: &[(&Holding, f64)],
        trial: &BTreeMap<String, f64>,
        symbol: &str,
    ) -> bool {
        let strategy = self.strategy;
        if trial.get(symbol).copied().unwrap_or(0.0) > strategy.max_position_weight + WEIGHT_TOLERANCE {
            return false;
        }
        let reweighted = reweight(weighted, trial);
        [
            (Dimension::Sector, strategy.max_sector_hhi),
            (Dimension::Region, strategy.max_region_hhi),
        ]
        .into_iter()
        .all(|(dimension, cap)| {
            ConcentrationIndex::compute(&reweighted, dimension)
                .is_none_or(|index| index.hhi <= cap + WEIGHT_TOLERANCE)
        })
    }
}

/// Largest raw addition to `symbol` whose renormalised weight stays at `cap`.
/// With total `t` and current `p`, `(p + m) / (t + m) <= cap` solves to
/// `m <= (cap * t - p) / (1 - cap)`.
fn increase_headroom(projected: &BTreeMap<String, f64>, symbol: &str, cap: f64) -> f64 {
    if cap >= 1.0 {
        return f64::INFINITY;
    }
    let total: f64 = projected.values().sum();
    let current = projected.get(symbol).copied().unwrap_or(0.0);
    (cap * total - current) / (1.0 - cap)
}

fn sell_reasons(signals: &HoldingSignals) -> Vec<Reason> {
    let mut reasons = Vec::new();
    if signals.health == Some(HealthStatus::Exit) {
        reasons.push(Reason::ExitSignal);
    }
    if let Some(impact) = signals.scenario_impact {
        if impact < SELL_IMPACT_THRESHOLD {
            reasons.push(Reason::ScenarioLoss { impact });
        }
    }
    reasons
}

/// Apply one action to raw (unnormalised) weights.
pub fn apply_action(weights: &mut BTreeMap<String, f64>, action: &Action) {
    let Some(w) = weights.get_mut(&action.symbol) else {
        return;
    };
    *w = match action.kind {
        ActionKind::Sell => 0.0,
        ActionKind::Reduce => (*w - action.magnitude).max(0.0),
        ActionKind::Increase => *w + action.magnitude,
    };
}

/// Weights after every action, renormalised to sum to one.
pub fn project(weights: &BTreeMap<String, f64>, actions: &[Action]) -> BTreeMap<String, f64> {
    let mut projected = weights.clone();
    for action in actions {
        apply_action(&mut projected, action);
    }
    normalize_weights(&projected)
}

/// Pair holdings with the weights from `weights`, missing symbols at zero.
pub fn reweight<'h>(
    weighted: &[(&'h Holding, f64)],
    weights: &BTreeMap<String, f64>,
) -> Vec<(&'h Holding, f64)> {
    weighted
        .iter()
        .map(|(h, _)| (*h, weights.get(&h.symbol).copied().unwrap_or(0.0)))
        .collect()
}

fn sort_actions(actions: &mut [Action]) {
    actions.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| b.magnitude.total_cmp(&a.magnitude))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}
