//! Portfolio snapshot port.

use crate::domain::error::ShockwiseError;
use crate::domain::holding::Holding;

pub trait PortfolioPort {
    /// Current holdings with shares, cost, currency and base-currency market value.
    fn load_holdings(&self) -> Result<Vec<Holding>, ShockwiseError>;
}
