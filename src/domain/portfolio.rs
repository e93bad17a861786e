//! Portfolio snapshot and allocation weights.

use std::collections::{BTreeMap, HashSet};

use super::error::ShockwiseError;
use super::holding::Holding;

/// Tolerance used when checking that a set of weights sums to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    holdings: Vec<Holding>,
}

impl Portfolio {
    /// Build a portfolio, rejecting duplicate symbols.
    pub fn new(holdings: Vec<Holding>) -> Result<Self, ShockwiseError> {
        let mut seen = HashSet::new();
        for holding in &holdings {
            if !seen.insert(holding.symbol.as_str()) {
                return Err(ShockwiseError::DuplicateSymbol {
                    symbol: holding.symbol.clone(),
                });
            }
        }
        Ok(Portfolio { holdings })
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn get(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }

    pub fn total_value(&self) -> f64 {
        self.holdings.iter().map(|h| h.market_value).sum()
    }

    /// Weight of every holding (market value / total), keyed by symbol.
    ///
    /// Errors when the portfolio is empty or carries no value at all.
    pub fn weights(&self) -> Result<BTreeMap<String, f64>, ShockwiseError> {
        let total = self.total_value();
        if self.holdings.is_empty() || total <= 0.0 {
            return Err(ShockwiseError::EmptyPortfolio);
        }
        Ok(self
            .holdings
            .iter()
            .map(|h| (h.symbol.clone(), h.market_value / total))
            .collect())
    }

    /// Holdings paired with weights, in snapshot order.
    pub fn weighted(&self) -> Result<Vec<(&Holding, f64)>, ShockwiseError> {
        let weights = self.weights()?;
        Ok(self
            .holdings
            .iter()
            .map(|h| (h, weights[&h.symbol]))
            .collect())
    }
}

/// Rescale weights so they sum to one. All-zero input stays all-zero.
pub fn normalize_weights(weights: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let total: f64 = weights.values().map(|w| w.max(0.0)).sum();
    weights
        .iter()
        .map(|(symbol, &w)| {
            let w = if total > 0.0 { w.max(0.0) / total } else { 0.0 };
            (symbol.clone(), w)
        })
        .collect()
}
