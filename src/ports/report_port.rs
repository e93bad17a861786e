//! Report generation port.

use crate::domain::error::ShockwiseError;
use crate::domain::rebalance::RebalancePlan;
use crate::domain::risk_overview::RiskOverview;
use crate::domain::scenario::ScenarioCatalog;
use crate::domain::scenario_analysis::ScenarioReport;

/// Port for rendering engine output.
pub trait ReportPort {
    fn render_catalog(&self, catalog: &ScenarioCatalog) -> Result<String, ShockwiseError>;

    fn render_overview(&self, overview: &RiskOverview) -> Result<String, ShockwiseError>;

    fn render_scenario(&self, report: &ScenarioReport) -> Result<String, ShockwiseError>;

    fn render_plan(&self, plan: &RebalancePlan) -> Result<String, ShockwiseError>;
}
