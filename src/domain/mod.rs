//! Core domain types and logic.

pub mod concentration;
pub mod config_validation;
pub mod correlation;
pub mod error;
pub mod history;
pub mod holding;
pub mod matcher;
pub mod portfolio;
pub mod rebalance;
pub mod recommender;
pub mod returns;
pub mod risk_overview;
pub mod scenario;
pub mod scenario_analysis;
pub mod sensitivity;
pub mod signals;
pub mod strategy;
pub mod value_at_risk;
