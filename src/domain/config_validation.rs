//! Configuration validation and typed settings.
//!
//! Validates every section before a run, then builds the typed values the
//! engine consumes.

use std::collections::BTreeMap;

use crate::domain::correlation::MIN_OVERLAP;
use crate::domain::error::ShockwiseError;
use crate::domain::holding::normalize_sector;
use crate::domain::scenario_analysis::{AnalysisConfig, DEFAULT_CONTAGION_THRESHOLD, DEFAULT_HEAVY_SHOCK};
use crate::domain::strategy::{Strategy, StrategyOverrides};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_BASE_CURRENCY: &str = "USD";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;
pub const DEFAULT_PRESET: &str = "balanced";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), ShockwiseError> {
    validate_portfolio(config)?;
    validate_prices(config)?;
    validate_proxies(config)?;
    validate_analysis(config)?;
    validate_strategy(config)?;
    Ok(())
}

fn validate_portfolio(config: &dyn ConfigPort) -> Result<(), ShockwiseError> {
    require(config, "portfolio", "path")?;
    if let Some(code) = config.get_string("portfolio", "base_currency") {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid(
                "portfolio",
                "base_currency",
                "base_currency must be a three-letter currency code",
            ));
        }
    }
    Ok(())
}

fn validate_prices(config: &dyn ConfigPort) -> Result<(), ShockwiseError> {
    if let Some(raw) = config.get_string("prices", "end_date") {
        parse_date("prices", "end_date", &raw)?;
    }
    if let Some(days) = parse_number::<i64>(config, "prices", "lookback_days")? {
        if days <= 0 {
            return Err(invalid(
                "prices",
                "lookback_days",
                "lookback_days must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_proxies(config: &dyn ConfigPort) -> Result<(), ShockwiseError> {
    if let Some(raw) = config.get_string("proxies", "sectors") {
        parse_sector_proxies(&raw)?;
    }
    Ok(())
}

fn validate_analysis(config: &dyn ConfigPort) -> Result<(), ShockwiseError> {
    if let Some(n) = parse_number::<i64>(config, "analysis", "min_overlap")? {
        if n < 2 {
            return Err(invalid(
                "analysis",
                "min_overlap",
                "min_overlap must be at least 2",
            ));
        }
    }
    if let Some(t) = parse_number::<f64>(config, "analysis", "contagion_threshold")? {
        if !(t > 0.0 && t <= 1.0) {
            return Err(invalid(
                "analysis",
                "contagion_threshold",
                "contagion_threshold must be in (0, 1]",
            ));
        }
    }
    if let Some(s) = parse_number::<f64>(config, "analysis", "heavy_shock")? {
        if !(-1.0..0.0).contains(&s) {
            return Err(invalid(
                "analysis",
                "heavy_shock",
                "heavy_shock must be in [-1, 0)",
            ));
        }
    }
    Ok(())
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), ShockwiseError> {
    strategy_from_config(config, None).map(|_| ())
}

/// Build the rebalancing strategy: preset from `[strategy] preset` unless
/// `preset_override` is given, with any threshold keys layered on top.
pub fn strategy_from_config(
    config: &dyn ConfigPort,
    preset_override: Option<&str>,
) -> Result<Strategy, ShockwiseError> {
    let preset = preset_override
        .map(str::to_string)
        .or_else(|| config.get_string("strategy", "preset"))
        .unwrap_or_else(|| DEFAULT_PRESET.to_string());

    let overrides = StrategyOverrides {
        max_position_weight: parse_number(config, "strategy", "max_position_weight")?,
        max_sector_hhi: parse_number(config, "strategy", "max_sector_hhi")?,
        max_region_hhi: parse_number(config, "strategy", "max_region_hhi")?,
        increase_step: parse_number(config, "strategy", "increase_step")?,
    };

    Strategy::resolve(&preset, &overrides)
}

pub fn analysis_config_from_config(config: &dyn ConfigPort) -> AnalysisConfig {
    AnalysisConfig {
        contagion_threshold: config.get_double(
            "analysis",
            "contagion_threshold",
            DEFAULT_CONTAGION_THRESHOLD,
        ),
        heavy_shock: config.get_double("analysis", "heavy_shock", DEFAULT_HEAVY_SHOCK),
    }
}

pub fn min_overlap_from_config(config: &dyn ConfigPort) -> usize {
    let n = config.get_int("analysis", "min_overlap", MIN_OVERLAP as i64);
    usize::try_from(n).unwrap_or(MIN_OVERLAP)
}

pub fn base_currency_from_config(config: &dyn ConfigPort) -> String {
    config
        .get_string("portfolio", "base_currency")
        .map(|c| c.trim().to_ascii_uppercase())
        .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string())
}

pub fn end_date_from_config(config: &dyn ConfigPort) -> Result<Option<NaiveDate>, ShockwiseError> {
    config
        .get_string("prices", "end_date")
        .map(|raw| parse_date("prices", "end_date", &raw))
        .transpose()
}

pub fn lookback_days_from_config(config: &dyn ConfigPort) -> i64 {
    config.get_int("prices", "lookback_days", DEFAULT_LOOKBACK_DAYS)
}

/// Parse `Sector:SYMBOL, Sector:SYMBOL` into sector → proxy symbol.
pub fn parse_sector_proxies(raw: &str) -> Result<BTreeMap<String, String>, ShockwiseError> {
    let mut sectors = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (sector, symbol) = entry
            .split_once(':')
            .map(|(s, y)| (s.trim(), y.trim()))
            .filter(|(s, y)| !s.is_empty() && !y.is_empty())
            .ok_or_else(|| {
                invalid(
                    "proxies",
                    "sectors",
                    &format!("expected Sector:SYMBOL, got '{entry}'"),
                )
            })?;
        let sector = normalize_sector(Some(sector)).unwrap_or_else(|| sector.to_string());
        if sectors.insert(sector.clone(), symbol.to_string()).is_some() {
            return Err(invalid(
                "proxies",
                "sectors",
                &format!("sector '{sector}' listed twice"),
            ));
        }
    }
    Ok(sectors)
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, ShockwiseError> {
    config
        .get_string(section, key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ShockwiseError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn parse_number<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, ShockwiseError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("'{}' is not a number", raw.trim()))),
    }
}

fn parse_date(section: &str, key: &str, s: &str) -> Result<NaiveDate, ShockwiseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(section, key, "invalid date format (expected YYYY-MM-DD)"))
}

fn invalid(section: &str, key: &str, reason: &str) -> ShockwiseError {
    ShockwiseError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const MINIMAL: &str = "[portfolio]\npath = holdings.csv\n";

    #[test]
    fn minimal_config_passes() {
        assert!(validate_config(&make_config(MINIMAL)).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[portfolio]
path = holdings.csv
base_currency = jpy

[prices]
dir = prices
end_date = 2026-09-30
lookback_days = 250

[proxies]
rate = TLT
fx = UUP
sectors = Technology:XLK, Energy:XLE

[analysis]
min_overlap = 30
contagion_threshold = 0.8
heavy_shock = -0.2

[strategy]
preset = defensive
max_position_weight = 0.12
"#,
        );
        validate_config(&config).unwrap();
        assert_eq!(base_currency_from_config(&config), "JPY");
        assert_eq!(lookback_days_from_config(&config), 250);
        assert_eq!(min_overlap_from_config(&config), 30);
        assert_eq!(
            end_date_from_config(&config).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 30)
        );
        let analysis = analysis_config_from_config(&config);
        assert_eq!(analysis.contagion_threshold, 0.8);
        assert_eq!(analysis.heavy_shock, -0.2);
    }

    #[test]
    fn missing_portfolio_path() {
        let err = validate_config(&make_config("[prices]\ndir = prices\n")).unwrap_err();
        assert!(
            matches!(err, ShockwiseError::ConfigMissing { ref section, ref key } if section == "portfolio" && key == "path")
        );
    }

    #[test]
    fn bad_base_currency() {
        let config = make_config("[portfolio]\npath = h.csv\nbase_currency = dollars\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ShockwiseError::ConfigInvalid { ref key, .. } if key == "base_currency"));
    }

    #[test]
    fn bad_end_date() {
        let config = make_config(&format!("{MINIMAL}[prices]\nend_date = 30/09/2026\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ShockwiseError::ConfigInvalid { ref key, .. } if key == "end_date"));
    }

    #[test]
    fn non_positive_lookback() {
        let config = make_config(&format!("{MINIMAL}[prices]\nlookback_days = 0\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ShockwiseError::ConfigInvalid { ref key, .. } if key == "lookback_days"));
    }

    #[test]
    fn non_numeric_value_is_rejected_not_defaulted() {
        let config = make_config(&format!("{MINIMAL}[analysis]\ncontagion_threshold = high\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, ShockwiseError::ConfigInvalid { ref key, .. } if key == "contagion_threshold")
        );
    }

    #[test]
    fn min_overlap_too_small() {
        let config = make_config(&format!("{MINIMAL}[analysis]\nmin_overlap = 1\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ShockwiseError::ConfigInvalid { ref key, .. } if key == "min_overlap"));
    }

    #[test]
    fn heavy_shock_must_be_negative() {
        let config = make_config(&format!("{MINIMAL}[analysis]\nheavy_shock = 0.1\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ShockwiseError::ConfigInvalid { ref key, .. } if key == "heavy_shock"));
    }

    #[test]
    fn unknown_preset() {
        let config = make_config(&format!("{MINIMAL}[strategy]\npreset = reckless\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ShockwiseError::UnknownStrategy { .. }));
    }

    #[test]
    fn invalid_override() {
        let config = make_config(&format!("{MINIMAL}[strategy]\nmax_sector_hhi = 1.5\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ShockwiseError::InvalidStrategy { ref field, .. } if field == "max_sector_hhi"));
    }

    #[test]
    fn preset_override_beats_config() {
        let config = make_config(&format!("{MINIMAL}[strategy]\npreset = defensive\n"));
        let s = strategy_from_config(&config, Some("aggressive")).unwrap();
        assert_eq!(s.name, "aggressive");
        assert_eq!(strategy_from_config(&config, None).unwrap().name, "defensive");
    }

    #[test]
    fn defaults_when_sections_absent() {
        let config = make_config(MINIMAL);
        assert_eq!(base_currency_from_config(&config), DEFAULT_BASE_CURRENCY);
        assert_eq!(lookback_days_from_config(&config), DEFAULT_LOOKBACK_DAYS);
        assert_eq!(min_overlap_from_config(&config), MIN_OVERLAP);
        assert_eq!(end_date_from_config(&config).unwrap(), None);
        assert_eq!(strategy_from_config(&config, None).unwrap().name, DEFAULT_PRESET);
        assert_eq!(analysis_config_from_config(&config), AnalysisConfig::default());
    }

    #[test]
    fn sector_proxies_parse() {
        let sectors = parse_sector_proxies("Technology:XLK,  Energy : XLE ,").unwrap();
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors["Technology"], "XLK");
        assert_eq!(sectors["Energy"], "XLE");

        let sectors = parse_sector_proxies("technology:XLK").unwrap();
        assert_eq!(sectors["Technology"], "XLK");
    }

    #[test]
    fn sector_proxies_reject_malformed_and_duplicates() {
        assert!(parse_sector_proxies("Technology XLK").is_err());
        assert!(parse_sector_proxies("Technology:").is_err());
        assert!(parse_sector_proxies("Energy:XLE, Energy:VDE").is_err());
        assert!(parse_sector_proxies("Energy:XLE, energy:VDE").is_err());
    }
}
