//! CSV price history adapter: one `{symbol}.csv` file per symbol.

use crate::domain::error::ShockwiseError;
use crate::domain::returns::PricePoint;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    close: f64,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

impl PricePort for CsvPriceAdapter {
    fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, ShockwiseError> {
        let path = self.csv_path(symbol);
        if !path.is_file() {
            return Err(ShockwiseError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let mut points = Vec::new();
        for result in rdr.deserialize::<PriceRow>() {
            let row = result.map_err(|e| ShockwiseError::Data {
                reason: format!("{}: {}", path.display(), e),
            })?;
            if row.date < start || row.date > end {
                continue;
            }
            points.push(PricePoint {
                date: row.date,
                close: row.close,
            });
        }

        points.sort_by_key(|p| p.date);
        tracing::debug!(%symbol, rows = points.len(), "price file read");
        Ok(points)
    }
}
