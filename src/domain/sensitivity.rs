//! Per-holding sensitivity to macro risk factors.
//!
//! Equities are scored against proxy index returns (rate, FX, sector).
//! Non-equity ETFs get fixed scores from their asset class, and cash is
//! scored from its currency alone.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::correlation::MIN_OVERLAP;
use crate::domain::holding::{AssetClass, EtfBacking, Holding};
use crate::domain::returns::{beta, ReturnSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    InterestRate,
    Currency,
    SectorDrawdown,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 3] = [
        RiskFactor::InterestRate,
        RiskFactor::Currency,
        RiskFactor::SectorDrawdown,
    ];
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskFactor::InterestRate => "interest rate",
            RiskFactor::Currency => "currency",
            RiskFactor::SectorDrawdown => "sector drawdown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotScoredReason {
    NoHistory,
    InsufficientHistory,
    NoProxy,
    DegenerateProxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Sensitivity {
    Scored { score: f64 },
    NotScored { reason: NotScoredReason },
}

impl Sensitivity {
    pub fn score(self) -> Option<f64> {
        match self {
            Sensitivity::Scored { score } => Some(score),
            Sensitivity::NotScored { .. } => None,
        }
    }

    fn not_scored(reason: NotScoredReason) -> Self {
        Sensitivity::NotScored { reason }
    }
}

/// Fixed (rate, currency, sector) scores per non-equity ETF backing.
const ASSET_CLASS_SCORES: &[(EtfBacking, f64, f64, f64)] = &[
    (EtfBacking::Gold, -0.4, -0.8, 0.0),
    (EtfBacking::LongBond, -1.8, -0.2, 0.0),
    (EtfBacking::Commodity, -0.3, -0.5, 0.0),
];

/// Proxy return series used to measure co-movement.
#[derive(Debug, Clone, Default)]
pub struct FactorProxies {
    pub interest_rate: Option<ReturnSeries>,
    pub currency: Option<ReturnSeries>,
    /// Sector name → sector index returns.
    pub sectors: BTreeMap<String, ReturnSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityProfile {
    pub symbol: String,
    pub scores: BTreeMap<RiskFactor, Sensitivity>,
}

impl SensitivityProfile {
    pub fn get(&self, factor: RiskFactor) -> Sensitivity {
        self.scores
            .get(&factor)
            .copied()
            .unwrap_or(Sensitivity::not_scored(NotScoredReason::NoHistory))
    }
}

pub struct SensitivityScorer<'a> {
    proxies: &'a FactorProxies,
    base_currency: String,
    min_overlap: usize,
}

impl<'a> SensitivityScorer<'a> {
    pub fn new(proxies: &'a FactorProxies, base_currency: &str) -> Self {
        SensitivityScorer {
            proxies,
            base_currency: base_currency.to_ascii_uppercase(),
            min_overlap: MIN_OVERLAP,
        }
    }

    pub fn with_min_overlap(mut self, min_overlap: usize) -> Self {
        self.min_overlap = min_overlap;
        self
    }

    pub fn score(&self, holding: &Holding, history: Option<&ReturnSeries>) -> SensitivityProfile {
        let scores = match holding.asset_class {
            AssetClass::Cash => self.score_cash(holding),
            AssetClass::Etf(backing) if backing != EtfBacking::Equity => {
                score_by_asset_class(backing)
            }
            _ => self.score_by_history(holding, history),
        };
        SensitivityProfile {
            symbol: holding.symbol.clone(),
            scores,
        }
    }

    /// Profiles for a set of holdings, keyed by symbol.
    pub fn score_all<'h>(
        &self,
        holdings: impl IntoIterator<Item = &'h Holding>,
        history: impl Fn(&str) -> Option<&'h ReturnSeries>,
    ) -> BTreeMap<String, SensitivityProfile> {
        holdings
            .into_iter()
            .map(|h| (h.symbol.clone(), self.score(h, history(&h.symbol))))
            .collect()
    }

    fn score_cash(&self, holding: &Holding) -> BTreeMap<RiskFactor, Sensitivity> {
        let fx = if holding.currency == self.base_currency {
            0.0
        } else {
            1.0
        };
        BTreeMap::from([
            (RiskFactor::InterestRate, Sensitivity::Scored { score: 0.0 }),
            (RiskFactor::Currency, Sensitivity::Scored { score: fx }),
            (RiskFactor::SectorDrawdown, Sensitivity::Scored { score: 0.0 }),
        ])
    }

    fn score_by_history(
        &self,
        holding: &Holding,
        history: Option<&ReturnSeries>,
    ) -> BTreeMap<RiskFactor, Sensitivity> {
        let Some(series) = history.filter(|s| !s.is_empty()) else {
            return RiskFactor::ALL
                .iter()
                .map(|&f| (f, Sensitivity::not_scored(NotScoredReason::NoHistory)))
                .collect();
        };

        let sector_proxy = holding
            .sector
            .as_deref()
            .and_then(|s| self.proxies.sectors.get(s));

        let scores = BTreeMap::from([
            (
                RiskFactor::InterestRate,
                self.full_beta(series, self.proxies.interest_rate.as_ref()),
            ),
            (
                RiskFactor::Currency,
                self.full_beta(series, self.proxies.currency.as_ref()),
            ),
            (
                RiskFactor::SectorDrawdown,
                self.downside_beta(series, sector_proxy),
            ),
        ]);

        for (factor, s) in &scores {
            if let Sensitivity::NotScored { reason } = s {
                tracing::debug!(symbol = %holding.symbol, %factor, ?reason, "sensitivity not scored");
            }
        }
        scores
    }

    fn full_beta(&self, series: &ReturnSeries, proxy: Option<&ReturnSeries>) -> Sensitivity {
        let Some(proxy) = proxy else {
            return Sensitivity::not_scored(NotScoredReason::NoProxy);
        };
        let (ys, xs) = series.aligned_with(proxy);
        self.regress(&ys, &xs)
    }

    /// Beta measured only on days the sector proxy fell.
    fn downside_beta(&self, series: &ReturnSeries, proxy: Option<&ReturnSeries>) -> Sensitivity {
        let Some(proxy) = proxy else {
            return Sensitivity::not_scored(NotScoredReason::NoProxy);
        };
        let (ys, xs) = series.aligned_with(proxy);
        let (ys, xs): (Vec<f64>, Vec<f64>) = ys
            .into_iter()
            .zip(xs)
            .filter(|(_, x)| *x < 0.0)
            .unzip();
        self.regress(&ys, &xs)
    }

    fn regress(&self, ys: &[f64], xs: &[f64]) -> Sensitivity {
        if xs.len() < self.min_overlap.max(2) {
            return Sensitivity::not_scored(NotScoredReason::InsufficientHistory);
        }
        match beta(ys, xs) {
            Some(score) => Sensitivity::Scored { score },
            None => Sensitivity::not_scored(NotScoredReason::DegenerateProxy),
        }
    }
}

fn score_by_asset_class(backing: EtfBacking) -> BTreeMap<RiskFactor, Sensitivity> {
    let (rate, fx, sector) = ASSET_CLASS_SCORES
        .iter()
        .find(|(b, ..)| *b == backing)
        .map(|&(_, r, f, s)| (r, f, s))
        .unwrap_or((0.0, 0.0, 0.0));
    BTreeMap::from([
        (RiskFactor::InterestRate, Sensitivity::Scored { score: rate }),
        (RiskFactor::Currency, Sensitivity::Scored { score: fx }),
        (RiskFactor::SectorDrawdown, Sensitivity::Scored { score: sector }),
    ])
}
