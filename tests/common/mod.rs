#![allow(dead_code)]

use chrono::NaiveDate;
use shockwise::domain::error::ShockwiseError;
use shockwise::domain::holding::{Holding, HoldingInput};
use shockwise::domain::portfolio::Portfolio;
use shockwise::domain::returns::{DailyReturn, PricePoint, ReturnSeries};
use shockwise::domain::signals::{HealthStatus, ReturnEstimate};
use shockwise::ports::price_port::PricePort;
use shockwise::ports::signal_port::{HealthPort, ReturnEstimatePort};
use std::collections::HashMap;

pub struct MockPricePort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: Vec<PricePoint>) -> Self {
        self.data.insert(symbol.to_string(), closes);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, ShockwiseError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ShockwiseError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start && p.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockSignals {
    pub health: HashMap<String, HealthStatus>,
    pub estimates: HashMap<String, ReturnEstimate>,
}

impl MockSignals {
    pub fn with_health(mut self, symbol: &str, status: HealthStatus) -> Self {
        self.health.insert(symbol.to_string(), status);
        self
    }

    pub fn with_base_return(mut self, symbol: &str, base: f64) -> Self {
        self.estimates.insert(
            symbol.to_string(),
            ReturnEstimate {
                optimistic: base + 0.1,
                base,
                pessimistic: base - 0.1,
            },
        );
        self
    }
}

impl HealthPort for MockSignals {
    fn health(&self, symbol: &str) -> Option<HealthStatus> {
        self.health.get(symbol).copied()
    }
}

impl ReturnEstimatePort for MockSignals {
    fn estimate(&self, symbol: &str) -> Option<ReturnEstimate> {
        self.estimates.get(symbol).copied()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn holding(symbol: &str, sector: Option<&str>, market_value: f64) -> Holding {
    Holding::from_input(HoldingInput {
        symbol: symbol.into(),
        shares: 1.0,
        cost_basis: 1.0,
        sector: sector.map(String::from),
        market_value,
        ..Default::default()
    })
    .unwrap()
}

pub fn portfolio(holdings: Vec<Holding>) -> Portfolio {
    Portfolio::new(holdings).unwrap()
}

/// Closes on consecutive days built by compounding `returns` from 100.
pub fn closes_from_returns(start: NaiveDate, returns: &[f64]) -> Vec<PricePoint> {
    let mut close = 100.0;
    let mut points = vec![PricePoint { date: start, close }];
    for (i, r) in returns.iter().enumerate() {
        close *= 1.0 + r;
        points.push(PricePoint {
            date: start + chrono::Days::new(i as u64 + 1),
            close,
        });
    }
    points
}

pub fn return_series(symbol: &str, start: NaiveDate, values: &[f64]) -> ReturnSeries {
    ReturnSeries {
        symbol: symbol.to_string(),
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

/// Deterministic pseudo-random returns in roughly ±2%.
pub fn noise(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.04
        })
        .collect()
}
