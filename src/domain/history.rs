//! Loading return series through the price port.
//!
//! Symbols with no usable history are skipped and reported; the rest of the
//! run proceeds with whatever subset has data.

use crate::domain::returns::ReturnSeries;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use serde::Serialize;

/// Minimum number of daily returns needed before a series is worth keeping.
pub const MIN_RETURNS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SkipReason {
    Unavailable { detail: String },
    NoData,
    InsufficientHistory { returns: usize },
}

#[derive(Debug, Clone, Default)]
pub struct HistoryLoad {
    pub series: Vec<ReturnSeries>,
    pub skipped: Vec<SkippedSymbol>,
}

impl HistoryLoad {
    pub fn get(&self, symbol: &str) -> Option<&ReturnSeries> {
        self.series.iter().find(|s| s.symbol == symbol)
    }
}

pub fn load_history(
    port: &dyn PricePort,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> HistoryLoad {
    let mut load = HistoryLoad::default();

    for symbol in symbols {
        let prices = match port.fetch_closes(symbol, start, end) {
            Ok(prices) => prices,
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "price history unavailable, skipping");
                load.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::Unavailable {
                        detail: e.to_string(),
                    },
                });
                continue;
            }
        };

        if prices.is_empty() {
            tracing::warn!(%symbol, "no price data found, skipping");
            load.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        let series = ReturnSeries::from_prices(symbol, &prices);
        if series.len() < MIN_RETURNS {
            tracing::warn!(
                %symbol,
                returns = series.len(),
                minimum = MIN_RETURNS,
                "insufficient history, skipping"
            );
            load.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::InsufficientHistory {
                    returns: series.len(),
                },
            });
            continue;
        }

        tracing::debug!(%symbol, returns = series.len(), "history loaded");
        load.series.push(series);
    }

    if !load.skipped.is_empty() {
        tracing::info!(
            loaded = load.series.len(),
            requested = symbols.len(),
            "loaded price history for a subset of symbols"
        );
    }

    load
}
