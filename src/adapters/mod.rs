//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_portfolio_adapter;
pub mod csv_signal_adapter;
pub mod file_config_adapter;
pub mod json_report;
pub mod markdown_report;
