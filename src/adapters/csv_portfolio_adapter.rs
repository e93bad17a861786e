//! CSV holdings ledger adapter.
//!
//! Columns: `symbol,shares,cost_basis,currency,sector,region,quote_type,market_value`.
//! Currency, sector, region and quote_type may be blank or absent.

use crate::domain::error::ShockwiseError;
use crate::domain::holding::{Holding, HoldingInput};
use crate::ports::portfolio_port::PortfolioPort;
use serde::Deserialize;
use std::path::PathBuf;

pub struct CsvPortfolioAdapter {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct HoldingRow {
    symbol: String,
    shares: f64,
    cost_basis: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    quote_type: Option<String>,
    market_value: f64,
}

impl From<HoldingRow> for HoldingInput {
    fn from(row: HoldingRow) -> Self {
        HoldingInput {
            symbol: row.symbol,
            shares: row.shares,
            cost_basis: row.cost_basis,
            currency: row.currency,
            sector: row.sector,
            region: row.region,
            quote_type: row.quote_type,
            market_value: row.market_value,
        }
    }
}

impl CsvPortfolioAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PortfolioPort for CsvPortfolioAdapter {
    fn load_holdings(&self) -> Result<Vec<Holding>, ShockwiseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| ShockwiseError::Data {
                reason: format!("failed to open {}: {}", self.path.display(), e),
            })?;

        let mut holdings = Vec::new();
        for (i, result) in rdr.deserialize::<HoldingRow>().enumerate() {
            let row = result.map_err(|e| ShockwiseError::Data {
                reason: format!("{} row {}: {}", self.path.display(), i + 1, e),
            })?;
            holdings.push(Holding::from_input(row.into())?);
        }

        tracing::info!(path = %self.path.display(), holdings = holdings.len(), "portfolio loaded");
        Ok(holdings)
    }
}
