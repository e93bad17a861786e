//! Historical-simulation value at risk and volatility of the weighted
//! portfolio.
//!
//! The portfolio's daily return is the weight-averaged return of every
//! holding with history on dates all of them share. Cash contributes a zero
//! return at its weight; holdings without history are left out and the
//! weight that remains is reported as `coverage`.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::history::HistoryLoad;
use crate::domain::holding::Holding;
use crate::domain::returns::std_dev;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const TRADING_DAYS_PER_MONTH: f64 = 21.0;

/// Monthly 95% VaR below this is a high-priority alert.
pub const SEVERE_MONTHLY_VAR: f64 = -0.15;
/// Monthly 95% VaR below this is a medium-priority alert.
pub const ELEVATED_MONTHLY_VAR: f64 = -0.10;
/// Annualised volatility above this is a medium-priority alert.
pub const HIGH_VOLATILITY: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarLevels {
    pub p95: f64,
    pub p99: f64,
}

impl VarLevels {
    fn scaled(self, factor: f64) -> Self {
        VarLevels {
            p95: self.p95 * factor,
            p99: self.p99 * factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioVar {
    pub observation_days: usize,
    /// Portfolio weight backed by price history, cash included.
    pub coverage: f64,
    /// Daily return at the 5th and 1st percentile; negative means a loss.
    pub daily: VarLevels,
    /// Daily levels scaled by the square root of a trading month.
    pub monthly: VarLevels,
    /// Annualised standard deviation of daily returns.
    pub volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    High,
    Medium,
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RiskAlert {
    MonthlyVar { priority: AlertPriority, var_95: f64 },
    HighVolatility { priority: AlertPriority, volatility: f64 },
}

impl RiskAlert {
    pub fn priority(&self) -> AlertPriority {
        match self {
            RiskAlert::MonthlyVar { priority, .. } | RiskAlert::HighVolatility { priority, .. } => {
                *priority
            }
        }
    }
}

impl fmt::Display for RiskAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskAlert::MonthlyVar { priority, var_95 } => write!(
                f,
                "[{priority}] monthly VaR(95%) {:+.1}%",
                var_95 * 100.0
            ),
            RiskAlert::HighVolatility {
                priority,
                volatility,
            } => write!(
                f,
                "[{priority}] annualised volatility {:.1}%",
                volatility * 100.0
            ),
        }
    }
}

impl PortfolioVar {
    /// `None` when fewer than `min_observations` shared dates exist or no
    /// non-cash holding has history.
    pub fn compute(
        weighted: &[(&Holding, f64)],
        history: &HistoryLoad,
        min_observations: usize,
    ) -> Option<Self> {
        let mut coverage = 0.0;
        let mut legs: Vec<(f64, BTreeMap<NaiveDate, f64>)> = Vec::new();
        for &(holding, weight) in weighted {
            if holding.asset_class.is_cash() {
                coverage += weight;
                continue;
            }
            let Some(series) = history.get(&holding.symbol).filter(|s| !s.is_empty()) else {
                continue;
            };
            coverage += weight;
            legs.push((
                weight,
                series.returns.iter().map(|r| (r.date, r.value)).collect(),
            ));
        }
        if coverage <= 0.0 {
            return None;
        }

        let (first, rest) = legs.split_first()?;
        let returns: Vec<f64> = first
            .1
            .keys()
            .filter(|date| rest.iter().all(|(_, leg)| leg.contains_key(*date)))
            .map(|date| legs.iter().map(|(w, leg)| w * leg[date]).sum::<f64>() / coverage)
            .collect();

        if returns.len() < min_observations.max(2) {
            tracing::debug!(
                observations = returns.len(),
                min_observations,
                "too few shared dates for value at risk"
            );
            return None;
        }

        let mut sorted = returns.clone();
        sorted.sort_by(f64::total_cmp);
        let daily = VarLevels {
            p95: percentile(&sorted, 0.05),
            p99: percentile(&sorted, 0.01),
        };

        Some(PortfolioVar {
            observation_days: returns.len(),
            coverage,
            daily,
            monthly: daily.scaled(TRADING_DAYS_PER_MONTH.sqrt()),
            volatility: std_dev(&returns)? * TRADING_DAYS_PER_YEAR.sqrt(),
        })
    }

    pub fn alerts(&self) -> Vec<RiskAlert> {
        let mut alerts = Vec::new();
        let var_95 = self.monthly.p95;
        if var_95 < SEVERE_MONTHLY_VAR {
            alerts.push(RiskAlert::MonthlyVar {
                priority: AlertPriority::High,
                var_95,
            });
        } else if var_95 < ELEVATED_MONTHLY_VAR {
            alerts.push(RiskAlert::MonthlyVar {
                priority: AlertPriority::Medium,
                var_95,
            });
        }
        if self.volatility > HIGH_VOLATILITY {
            alerts.push(RiskAlert::HighVolatility {
                priority: AlertPriority::Medium,
                volatility: self.volatility,
            });
        }
        alerts
    }
}

/// Lower-tail value of ascending `sorted` at probability `tail`.
fn percentile(sorted: &[f64], tail: f64) -> f64 {
    let idx = ((sorted.len() as f64) * tail).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::holding::HoldingInput;
    use crate::domain::returns::{DailyReturn, ReturnSeries};
    use approx::assert_relative_eq;

    fn holding(symbol: &str, value: f64) -> Holding {
        Holding::from_input(HoldingInput {
            symbol: symbol.into(),
            shares: 1.0,
            cost_basis: 1.0,
            sector: Some("Technology".into()),
            market_value: value,
            ..Default::default()
        })
        .unwrap()
    }

    fn series(symbol: &str, values: &[f64]) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        ReturnSeries {
            symbol: symbol.into(),
            returns: values
                .iter()
                .enumerate()
                .map(|(i, &value)| DailyReturn {
                    date: start + chrono::Days::new(i as u64),
                    value,
                })
                .collect(),
        }
    }

    /// -5.0% .. +4.9% in 0.1% steps.
    fn ladder() -> Vec<f64> {
        (0..100).map(|k| (k as f64 - 50.0) / 1000.0).collect()
    }

    fn history(series: Vec<ReturnSeries>) -> HistoryLoad {
        HistoryLoad {
            series,
            skipped: vec![],
        }
    }

    #[test]
    fn percentiles_of_single_holding() {
        let a = holding("AAPL", 100.0);
        let var = PortfolioVar::compute(&[(&a, 1.0)], &history(vec![series("AAPL", &ladder())]), 20)
            .unwrap();
        assert_eq!(var.observation_days, 100);
        assert_relative_eq!(var.daily.p95, -0.045, epsilon = 1e-12);
        assert_relative_eq!(var.daily.p99, -0.049, epsilon = 1e-12);
        assert_relative_eq!(var.monthly.p95, -0.045 * 21f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(var.coverage, 1.0);
    }

    #[test]
    fn cash_dampens_losses() {
        let a = holding("AAPL", 50.0);
        let cash = holding("USD.CASH", 50.0);
        let var = PortfolioVar::compute(
            &[(&a, 0.5), (&cash, 0.5)],
            &history(vec![series("AAPL", &ladder())]),
            20,
        )
        .unwrap();
        assert_relative_eq!(var.daily.p95, -0.0225, epsilon = 1e-12);
        assert_relative_eq!(var.coverage, 1.0);
    }

    #[test]
    fn holdings_without_history_reduce_coverage() {
        let a = holding("AAPL", 60.0);
        let b = holding("NEW", 40.0);
        let var = PortfolioVar::compute(
            &[(&a, 0.6), (&b, 0.4)],
            &history(vec![series("AAPL", &ladder())]),
            20,
        )
        .unwrap();
        assert_relative_eq!(var.coverage, 0.6);
        assert_relative_eq!(var.daily.p95, -0.045, epsilon = 1e-12);
    }

    #[test]
    fn too_few_shared_dates() {
        let a = holding("AAPL", 1.0);
        let short = history(vec![series("AAPL", &ladder()[..10])]);
        assert!(PortfolioVar::compute(&[(&a, 1.0)], &short, 20).is_none());
        assert!(PortfolioVar::compute(&[(&a, 1.0)], &history(vec![]), 20).is_none());
    }

    #[test]
    fn alert_thresholds() {
        let at = |monthly_95: f64, volatility: f64| PortfolioVar {
            observation_days: 200,
            coverage: 1.0,
            daily: VarLevels { p95: 0.0, p99: 0.0 },
            monthly: VarLevels {
                p95: monthly_95,
                p99: monthly_95 * 1.5,
            },
            volatility,
        };

        let severe = at(-0.18, 0.20).alerts();
        assert_eq!(severe.len(), 1);
        assert_eq!(severe[0].priority(), AlertPriority::High);

        let elevated = at(-0.12, 0.20).alerts();
        assert!(matches!(
            elevated[..],
            [RiskAlert::MonthlyVar {
                priority: AlertPriority::Medium,
                ..
            }]
        ));

        assert!(at(-0.05, 0.20).alerts().is_empty());

        let volatile = at(-0.05, 0.35).alerts();
        assert!(matches!(
            volatile[..],
            [RiskAlert::HighVolatility {
                priority: AlertPriority::Medium,
                ..
            }]
        ));
    }
}
