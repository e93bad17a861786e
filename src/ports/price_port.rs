//! Price history port.

use crate::domain::error::ShockwiseError;
use crate::domain::returns::PricePoint;
use chrono::NaiveDate;

pub trait PricePort {
    /// Daily closes for `symbol` within `[start, end]`. An error or an empty
    /// vector both mean the symbol is unavailable for this run.
    fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, ShockwiseError>;
}
