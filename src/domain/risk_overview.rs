//! Portfolio-wide risk picture: concentration, co-movement, tail risk and
//! factor sensitivities, computed once per run and shared by the analysis
//! engine.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::concentration::ConcentrationProfile;
use crate::domain::correlation::{
    CorrelatedPair, CorrelationMatrix, CorrelationSummary, FactorDecomposition,
};
use crate::domain::error::ShockwiseError;
use crate::domain::history::{HistoryLoad, SkippedSymbol};
use crate::domain::portfolio::Portfolio;
use crate::domain::scenario_analysis::Evidence;
use crate::domain::sensitivity::{FactorProxies, SensitivityProfile, SensitivityScorer};
use crate::domain::value_at_risk::{PortfolioVar, RiskAlert};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskOverview {
    pub total_value: f64,
    pub weights: BTreeMap<String, f64>,
    pub concentration: ConcentrationProfile,
    pub correlation: CorrelationSummary,
    pub high_pairs: Vec<CorrelatedPair>,
    pub factors: FactorDecomposition,
    pub value_at_risk: Option<PortfolioVar>,
    pub alerts: Vec<RiskAlert>,
    pub sensitivities: BTreeMap<String, SensitivityProfile>,
    pub skipped: Vec<SkippedSymbol>,
    #[serde(skip)]
    matrix: CorrelationMatrix,
}

/// Inputs that shape the overview beyond the portfolio itself.
#[derive(Debug, Clone, Copy)]
pub struct OverviewSettings<'a> {
    pub base_currency: &'a str,
    pub min_overlap: usize,
    /// |r| at or above which a pair is listed as highly correlated.
    pub pair_threshold: f64,
}

impl RiskOverview {
    pub fn build(
        portfolio: &Portfolio,
        history: &HistoryLoad,
        proxies: &FactorProxies,
        settings: OverviewSettings<'_>,
    ) -> Result<Self, ShockwiseError> {
        let weighted = portfolio.weighted()?;
        let concentration = ConcentrationProfile::compute(&weighted);

        let matrix = CorrelationMatrix::compute(&history.series, settings.min_overlap);
        let summary = matrix.summary();
        if summary.undefined_pairs > 0 {
            tracing::warn!(
                undefined = summary.undefined_pairs,
                min_overlap = settings.min_overlap,
                "some correlations undefined"
            );
        }

        let value_at_risk = PortfolioVar::compute(&weighted, history, settings.min_overlap);
        let alerts = value_at_risk
            .as_ref()
            .map(PortfolioVar::alerts)
            .unwrap_or_default();
        for alert in &alerts {
            tracing::warn!(%alert, "portfolio risk alert");
        }

        let sensitivities = SensitivityScorer::new(proxies, settings.base_currency)
            .with_min_overlap(settings.min_overlap)
            .score_all(portfolio.holdings(), |symbol| history.get(symbol));

        Ok(RiskOverview {
            total_value: portfolio.total_value(),
            weights: portfolio.weights()?,
            concentration,
            correlation: summary,
            high_pairs: matrix.high_pairs(settings.pair_threshold),
            factors: matrix.factors(),
            value_at_risk,
            alerts,
            sensitivities,
            skipped: history.skipped.clone(),
            matrix,
        })
    }

    pub fn evidence(&self) -> Evidence<'_> {
        Evidence {
            correlations: Some(&self.matrix),
            sensitivities: Some(&self.sensitivities),
        }
    }
}
