//! Markdown rendering of risk overviews, scenario reports and rebalance plans.

use crate::domain::concentration::{ConcentrationLevel, Dimension};
use crate::domain::error::ShockwiseError;
use crate::domain::history::SkipReason;
use crate::domain::rebalance::{PlanJudgment, RebalancePlan};
use crate::domain::risk_overview::RiskOverview;
use crate::domain::scenario::ScenarioCatalog;
use crate::domain::sensitivity::{NotScoredReason, RiskFactor, Sensitivity};
use crate::domain::scenario_analysis::{ScenarioJudgment, ScenarioReport, StressFlag};
use crate::ports::report_port::ReportPort;
use std::fmt::Write;

pub struct MarkdownReportAdapter;

fn pct(x: f64) -> String {
    format!("{:+.1}%", x * 100.0)
}

fn weight(x: f64) -> String {
    format!("{:.1}%", x * 100.0)
}

fn scenario_judgment_label(j: ScenarioJudgment) -> &'static str {
    match j {
        ScenarioJudgment::Continue => "continue holding",
        ScenarioJudgment::Monitor => "monitor closely",
        ScenarioJudgment::Act => "act now",
    }
}

fn plan_judgment_label(j: PlanJudgment) -> &'static str {
    match j {
        PlanJudgment::Recommend => "recommended",
        PlanJudgment::Caution => "proceed with caution",
        PlanJudgment::NotRecommended => "not recommended",
    }
}

fn level_label(level: ConcentrationLevel) -> &'static str {
    match level {
        ConcentrationLevel::Diversified => "diversified",
        ConcentrationLevel::Moderate => "moderate",
        ConcentrationLevel::Concentrated => "concentrated",
    }
}

fn sensitivity_cell(s: Sensitivity) -> String {
    match s {
        Sensitivity::Scored { score } => format!("{score:+.2}"),
        Sensitivity::NotScored { reason } => {
            let why = match reason {
                NotScoredReason::NoHistory => "no history",
                NotScoredReason::InsufficientHistory => "short history",
                NotScoredReason::NoProxy => "no proxy",
                NotScoredReason::DegenerateProxy => "flat proxy",
            };
            format!("n/a ({why})")
        }
    }
}

fn write_stressed(out: &mut String, stressed: &[StressFlag]) -> std::fmt::Result {
    if stressed.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n## Stressed holdings\n")?;
    for flag in stressed {
        writeln!(
            out,
            "- {}: {} at {} of the portfolio",
            flag.symbol,
            pct(flag.shock),
            weight(flag.weight)
        )?;
    }
    Ok(())
}

fn write_catalog(out: &mut String, catalog: &ScenarioCatalog) -> std::fmt::Result {
    writeln!(out, "# Scenarios (catalog v{})\n", catalog.version())?;
    writeln!(out, "| Name | Label | Driver | Baseline | Aliases |")?;
    writeln!(out, "|---|---|---|---:|---|")?;
    for def in catalog.scenarios() {
        writeln!(
            out,
            "| `{}` | {} | {} | {} | {} |",
            def.name,
            def.label,
            def.driver,
            pct(def.baseline_shock),
            def.aliases.join(", ")
        )?;
    }
    Ok(())
}

fn write_overview(out: &mut String, overview: &RiskOverview) -> std::fmt::Result {
    writeln!(out, "# Portfolio risk overview\n")?;
    writeln!(out, "- Total value: {:.2}", overview.total_value)?;
    writeln!(out, "- Holdings: {}", overview.weights.len())?;

    writeln!(out, "\n## Concentration\n")?;
    writeln!(out, "| Dimension | HHI | Level | Largest group |")?;
    writeln!(out, "|---|---:|---|---|")?;
    for dimension in Dimension::ALL {
        match overview.concentration.get(dimension) {
            Some(index) => {
                let dominant = index
                    .dominant_group()
                    .map(|(g, w)| format!("{g} ({})", weight(w)))
                    .unwrap_or_default();
                writeln!(
                    out,
                    "| {} | {:.3} | {} | {} |",
                    dimension,
                    index.hhi,
                    level_label(index.level),
                    dominant
                )?;
            }
            None => writeln!(out, "| {dimension} | n/a | | |")?,
        }
    }

    writeln!(out, "\n## Correlation\n")?;
    let c = &overview.correlation;
    let stat = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "n/a".into());
    writeln!(
        out,
        "- Average {}, max {}, min {} over {} defined pairs ({} undefined)",
        stat(c.average),
        stat(c.max),
        stat(c.min),
        c.defined_pairs,
        c.undefined_pairs
    )?;
    for pair in &overview.high_pairs {
        writeln!(out, "- {} / {}: {:.2}", pair.a, pair.b, pair.correlation)?;
    }
    if let Some(share) = overview.factors.dominant_share() {
        writeln!(
            out,
            "- First common factor explains {} of co-movement",
            weight(share)
        )?;
    }
    if !overview.factors.excluded.is_empty() {
        writeln!(
            out,
            "- Left out of factor analysis: {}",
            overview.factors.excluded.join(", ")
        )?;
    }

    writeln!(out, "\n## Value at risk\n")?;
    match &overview.value_at_risk {
        Some(var) => {
            writeln!(out, "| Horizon | 95% | 99% |")?;
            writeln!(out, "|---|---:|---:|")?;
            writeln!(out, "| daily | {} | {} |", pct(var.daily.p95), pct(var.daily.p99))?;
            writeln!(
                out,
                "| monthly | {} | {} |",
                pct(var.monthly.p95),
                pct(var.monthly.p99)
            )?;
            writeln!(
                out,
                "\n- Annualised volatility {} over {} days, {} of weight covered",
                weight(var.volatility),
                var.observation_days,
                weight(var.coverage)
            )?;
        }
        None => writeln!(out, "Not enough shared price history.")?,
    }
    if !overview.alerts.is_empty() {
        writeln!(out, "\n## Alerts\n")?;
        for alert in &overview.alerts {
            writeln!(out, "- {alert}")?;
        }
    }

    writeln!(out, "\n## Sensitivities\n")?;
    writeln!(out, "| Symbol | Interest rate | Currency | Sector drawdown |")?;
    writeln!(out, "|---|---:|---:|---:|")?;
    for (symbol, profile) in &overview.sensitivities {
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            symbol,
            sensitivity_cell(profile.get(RiskFactor::InterestRate)),
            sensitivity_cell(profile.get(RiskFactor::Currency)),
            sensitivity_cell(profile.get(RiskFactor::SectorDrawdown))
        )?;
    }

    if !overview.skipped.is_empty() {
        writeln!(out, "\n## Skipped symbols\n")?;
        for skipped in &overview.skipped {
            let why = match &skipped.reason {
                SkipReason::Unavailable { detail } => format!("unavailable: {detail}"),
                SkipReason::NoData => "no price data".to_string(),
                SkipReason::InsufficientHistory { returns } => {
                    format!("only {returns} daily returns")
                }
            };
            writeln!(out, "- {}: {}", skipped.symbol, why)?;
        }
    }
    Ok(())
}

fn write_scenario(out: &mut String, report: &ScenarioReport) -> std::fmt::Result {
    writeln!(out, "# Scenario: {} (`{}`)\n", report.label, report.scenario)?;
    if let Some(version) = report.catalog_version {
        writeln!(out, "- Catalog version: {version}")?;
    }
    if let Some(driver) = report.driver {
        writeln!(out, "- Driving factor: {driver}")?;
    }
    writeln!(
        out,
        "- Portfolio impact: **{}** ({:+.2})",
        pct(report.portfolio_impact),
        report.portfolio_value_change
    )?;
    writeln!(out, "- Judgment: {}", scenario_judgment_label(report.judgment))?;
    if let Some(worst) = &report.worst_hit {
        writeln!(out, "- Worst hit: {worst}")?;
    }

    writeln!(out, "\n## Holdings\n")?;
    writeln!(
        out,
        "| Symbol | Weight | Shock | Matched by | Contribution | Value change | Driver sensitivity |"
    )?;
    writeln!(out, "|---|---:|---:|---|---:|---:|---:|")?;
    for i in &report.impacts {
        let matched = match &i.rule {
            Some(rule) => format!("{} ({rule})", i.stage),
            None => i.stage.to_string(),
        };
        let sensitivity = i
            .driver_sensitivity
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {:+.2} | {} |",
            i.symbol,
            weight(i.weight),
            pct(i.shock),
            matched,
            pct(i.contribution),
            i.value_change,
            sensitivity
        )?;
    }

    if !report.contagion.is_empty() {
        writeln!(out, "\n## Contagion\n")?;
        for note in &report.contagion {
            writeln!(
                out,
                "- {} (direct {}) moves with {} (corr {:.2}, shock {})",
                note.symbol,
                pct(note.direct_shock),
                note.source,
                note.correlation,
                pct(note.source_shock)
            )?;
        }
    }
    write_stressed(out, &report.stressed)
}

fn write_plan(out: &mut String, plan: &RebalancePlan) -> std::fmt::Result {
    let s = &plan.strategy;
    writeln!(out, "# Rebalance plan: {}\n", s.name)?;
    writeln!(out, "- Judgment: **{}**", plan_judgment_label(plan.judgment))?;
    writeln!(
        out,
        "- Limits: position {}, sector HHI {:.2}, region HHI {:.2}, increase step {}",
        weight(s.max_position_weight),
        s.max_sector_hhi,
        s.max_region_hhi,
        weight(s.increase_step)
    )?;
    if let Some(scenario) = &plan.scenario {
        writeln!(out, "- Baseline scenario: `{scenario}`")?;
    }

    writeln!(out, "\n## Actions\n")?;
    if plan.actions.is_empty() {
        writeln!(out, "No changes proposed.")?;
    } else {
        writeln!(out, "| Action | Symbol | Size | Reasons |")?;
        writeln!(out, "|---|---|---:|---|")?;
        for a in &plan.actions {
            let reasons: Vec<String> = a.reasons.iter().map(|r| r.to_string()).collect();
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                a.kind,
                a.symbol,
                weight(a.magnitude),
                reasons.join("; ")
            )?;
        }
    }

    writeln!(out, "\n## Allocation\n")?;
    writeln!(out, "| Symbol | Before | After |")?;
    writeln!(out, "|---|---:|---:|")?;
    for row in &plan.allocation {
        writeln!(out, "| {} | {} | {} |", row.symbol, weight(row.before), weight(row.after))?;
    }

    writeln!(out, "\n## Concentration (HHI)\n")?;
    writeln!(out, "| Dimension | Before | After | Cap |")?;
    writeln!(out, "|---|---:|---:|---:|")?;
    let hhi = |v: Option<f64>| v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "n/a".into());
    for c in &plan.concentration {
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            c.dimension,
            hhi(c.before),
            hhi(c.after),
            hhi(c.cap)
        )?;
    }

    if !plan.violations.is_empty() {
        writeln!(out, "\n## Residual violations\n")?;
        for v in &plan.violations {
            writeln!(out, "- {v}")?;
        }
    }

    write_stressed(out, &plan.stressed)?;

    if !plan.diversify_into.is_empty() {
        writeln!(out, "\n## Diversification\n")?;
        writeln!(out, "Sectors not held: {}", plan.diversify_into.join(", "))?;
    }
    Ok(())
}

impl ReportPort for MarkdownReportAdapter {
    fn render_catalog(&self, catalog: &ScenarioCatalog) -> Result<String, ShockwiseError> {
        let mut out = String::new();
        write_catalog(&mut out, catalog).map_err(|e| ShockwiseError::Data {
            reason: format!("failed to render scenario catalog: {e}"),
        })?;
        Ok(out)
    }

    fn render_overview(&self, overview: &RiskOverview) -> Result<String, ShockwiseError> {
        let mut out = String::new();
        write_overview(&mut out, overview).map_err(|e| ShockwiseError::Data {
            reason: format!("failed to render risk overview: {e}"),
        })?;
        Ok(out)
    }

    fn render_scenario(&self, report: &ScenarioReport) -> Result<String, ShockwiseError> {
        let mut out = String::new();
        write_scenario(&mut out, report).map_err(|e| ShockwiseError::Data {
            reason: format!("failed to render scenario report: {e}"),
        })?;
        Ok(out)
    }

    fn render_plan(&self, plan: &RebalancePlan) -> Result<String, ShockwiseError> {
        let mut out = String::new();
        write_plan(&mut out, plan).map_err(|e| ShockwiseError::Data {
            reason: format!("failed to render rebalance plan: {e}"),
        })?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::holding::{Holding, HoldingInput};
    use crate::domain::portfolio::Portfolio;
    use crate::domain::rebalance::Rebalancer;
    use crate::domain::scenario_analysis::{analyze, AnalysisConfig, Evidence, ScenarioSpec};
    use crate::domain::strategy::{Strategy, StrategyPreset};
    use crate::ports::signal_port::NoSignals;

    fn portfolio() -> Portfolio {
        let h = |symbol: &str, sector: &str, value: f64| {
            Holding::from_input(HoldingInput {
                symbol: symbol.into(),
                shares: 1.0,
                cost_basis: 1.0,
                sector: Some(sector.into()),
                market_value: value,
                ..Default::default()
            })
            .unwrap()
        };
        Portfolio::new(vec![
            h("7203.T", "Consumer Cyclical", 400.0),
            h("AAPL", "Technology", 350.0),
            h("XOM", "Energy", 250.0),
        ])
        .unwrap()
    }

    #[test]
    fn catalog_lists_aliases() {
        let md = MarkdownReportAdapter
            .render_catalog(&ScenarioCatalog::builtin().unwrap())
            .unwrap();
        assert!(md.contains("`japan_triple_decline`"));
        assert!(md.contains("トリプル安"));
        assert_eq!(md.matches("\n| `").count(), 8);
    }

    #[test]
    fn overview_without_history_marks_sensitivities_missing() {
        use crate::domain::history::{HistoryLoad, SkippedSymbol};
        use crate::domain::risk_overview::OverviewSettings;
        use crate::domain::sensitivity::FactorProxies;

        let history = HistoryLoad {
            series: vec![],
            skipped: vec![SkippedSymbol {
                symbol: "XOM".into(),
                reason: SkipReason::NoData,
            }],
        };
        let overview = RiskOverview::build(
            &portfolio(),
            &history,
            &FactorProxies::default(),
            OverviewSettings {
                base_currency: "USD",
                min_overlap: 20,
                pair_threshold: 0.7,
            },
        )
        .unwrap();
        let md = MarkdownReportAdapter.render_overview(&overview).unwrap();
        assert!(md.contains("| region | 0.520 | concentrated | US (60.0%) |"));
        assert!(md.contains("| AAPL | n/a (no history) |"));
        assert!(md.contains("- XOM: no price data"));
        assert!(md.contains("## Value at risk\n\nNot enough shared price history."));
        assert!(!md.contains("## Alerts"));
    }

    #[test]
    fn scenario_report_lists_stressed_holdings() {
        let report = analyze(
            &ScenarioCatalog::builtin().unwrap(),
            &ScenarioSpec::Custom {
                label: "meltdown".into(),
                shock: -0.4,
            },
            &portfolio(),
            Evidence::default(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let md = MarkdownReportAdapter.render_scenario(&report).unwrap();
        assert!(md.contains("## Stressed holdings"));
        assert!(md.contains("- 7203.T: -40.0% at 40.0% of the portfolio"));
    }

    #[test]
    fn scenario_report_lists_every_holding() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let report = analyze(
            &catalog,
            &ScenarioSpec::Named("tech_crash".into()),
            &portfolio(),
            Evidence::default(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let md = MarkdownReportAdapter.render_scenario(&report).unwrap();
        assert!(md.starts_with("# Scenario: "));
        assert!(md.contains("`tech_crash`"));
        for symbol in ["7203.T", "AAPL", "XOM"] {
            assert!(md.contains(&format!("| {symbol} |")), "missing {symbol}");
        }
        assert!(md.contains("sector (sector=Technology)"));
    }

    #[test]
    fn plan_report_shows_actions_and_concentration() {
        let strategy = Strategy::preset(StrategyPreset::Defensive);
        let plan = Rebalancer::new(&NoSignals, &NoSignals)
            .plan(&portfolio(), &strategy, None, &[])
            .unwrap();
        let md = MarkdownReportAdapter.render_plan(&plan).unwrap();
        assert!(md.contains("# Rebalance plan: defensive"));
        assert!(md.contains("| reduce | 7203.T |"));
        assert!(md.contains("## Concentration (HHI)"));
        assert!(md.contains("## Residual violations"));
        assert!(md.contains("## Diversification"));
        assert!(md.contains("Healthcare"));
        assert!(!md.contains("## Stressed holdings"));
    }
}
