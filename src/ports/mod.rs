//! Port traits: the narrow interfaces the engine consumes from collaborators.

pub mod config_port;
pub mod portfolio_port;
pub mod price_port;
pub mod report_port;
pub mod signal_port;
