//! JSON rendering via serde. Output is stable for identical inputs.

use crate::domain::error::ShockwiseError;
use crate::domain::rebalance::RebalancePlan;
use crate::domain::risk_overview::RiskOverview;
use crate::domain::scenario::ScenarioCatalog;
use crate::domain::scenario_analysis::ScenarioReport;
use crate::ports::report_port::ReportPort;
use serde::Serialize;

pub struct JsonReportAdapter;

fn to_json<T: Serialize>(value: &T) -> Result<String, ShockwiseError> {
    serde_json::to_string_pretty(value).map_err(|e| ShockwiseError::Data {
        reason: format!("failed to serialise report: {e}"),
    })
}

impl ReportPort for JsonReportAdapter {
    fn render_catalog(&self, catalog: &ScenarioCatalog) -> Result<String, ShockwiseError> {
        to_json(catalog)
    }

    fn render_overview(&self, overview: &RiskOverview) -> Result<String, ShockwiseError> {
        to_json(overview)
    }

    fn render_scenario(&self, report: &ScenarioReport) -> Result<String, ShockwiseError> {
        to_json(report)
    }

    fn render_plan(&self, plan: &RebalancePlan) -> Result<String, ShockwiseError> {
        to_json(plan)
    }
}
