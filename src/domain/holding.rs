//! Holdings and their ingestion-time classification.
//!
//! Every holding is classified exactly once when it enters the engine: an
//! [`AssetClass`] tag, a [`DemandProfile`], and a resolved region/currency.
//! Downstream modules branch on these enums and never re-derive them from
//! raw sector strings.

use serde::Serialize;
use std::fmt;

use crate::domain::error::ShockwiseError;

/// What an exchange-traded fund is actually backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EtfBacking {
    Equity,
    Gold,
    LongBond,
    Commodity,
}

impl fmt::Display for EtfBacking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EtfBacking::Equity => "Equity",
            EtfBacking::Gold => "Gold",
            EtfBacking::LongBond => "Long Bond",
            EtfBacking::Commodity => "Commodity",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "backing")]
pub enum AssetClass {
    Equity,
    Etf(EtfBacking),
    Cash,
    Unknown,
}

impl AssetClass {
    pub fn is_cash(self) -> bool {
        matches!(self, AssetClass::Cash)
    }

    /// Non-equity ETF backing, if any.
    pub fn non_equity_backing(self) -> Option<EtfBacking> {
        match self {
            AssetClass::Etf(backing) if backing != EtfBacking::Equity => Some(backing),
            _ => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Equity => f.write_str("Equity"),
            AssetClass::Etf(backing) => write!(f, "ETF ({backing})"),
            AssetClass::Cash => f.write_str("Cash"),
            AssetClass::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandProfile {
    ExportOriented,
    DomesticDemand,
    Unclassified,
}

impl fmt::Display for DemandProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DemandProfile::ExportOriented => "export-oriented",
            DemandProfile::DomesticDemand => "domestic-demand",
            DemandProfile::Unclassified => "unclassified",
        };
        f.write_str(label)
    }
}

/// Static asset-class lookup for ETFs whose nominal sector is empty or misleading.
pub const ETF_ASSET_CLASSES: &[(&str, EtfBacking)] = &[
    ("GLD", EtfBacking::Gold),
    ("IAU", EtfBacking::Gold),
    ("GLDM", EtfBacking::Gold),
    ("SGOL", EtfBacking::Gold),
    ("1540.T", EtfBacking::Gold),
    ("1328.T", EtfBacking::Gold),
    ("TLT", EtfBacking::LongBond),
    ("EDV", EtfBacking::LongBond),
    ("VGLT", EtfBacking::LongBond),
    ("2621.T", EtfBacking::LongBond),
    ("DBC", EtfBacking::Commodity),
    ("GSG", EtfBacking::Commodity),
    ("USO", EtfBacking::Commodity),
    ("1699.T", EtfBacking::Commodity),
    ("SPY", EtfBacking::Equity),
    ("VOO", EtfBacking::Equity),
    ("VTI", EtfBacking::Equity),
    ("QQQ", EtfBacking::Equity),
    ("1306.T", EtfBacking::Equity),
    ("1321.T", EtfBacking::Equity),
];

const EXPORT_SECTORS: &[&str] = &[
    "Technology",
    "Consumer Cyclical",
    "Industrials",
    "Basic Materials",
];

const DOMESTIC_SECTORS: &[&str] = &[
    "Utilities",
    "Real Estate",
    "Communication Services",
    "Consumer Defensive",
    "Financial Services",
];

/// Sectors treated as technology by the non-technology catch-all.
pub const TECHNOLOGY_SECTORS: &[&str] = &["Technology", "Communication Services"];

/// Canonical spelling of the sector names the engine keys on.
pub const KNOWN_SECTORS: &[&str] = &[
    "Technology",
    "Communication Services",
    "Consumer Cyclical",
    "Consumer Defensive",
    "Industrials",
    "Basic Materials",
    "Utilities",
    "Real Estate",
    "Financial Services",
    "Healthcare",
    "Energy",
];

/// Symbol suffix → (region, currency).
const MARKET_SUFFIXES: &[(&str, &str, &str)] = &[
    (".T", "JP", "JPY"),
    (".SI", "SG", "SGD"),
    (".HK", "HK", "HKD"),
    (".KS", "KR", "KRW"),
    (".BK", "TH", "THB"),
    (".KL", "MY", "MYR"),
];

/// Normalise a raw sector field: blank, `none`, `None`, `-` all mean "no sector".
/// Known sectors are folded onto their canonical spelling in any case.
pub fn normalize_sector(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    match trimmed {
        "" | "-" => None,
        s if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("null") => None,
        s => Some(
            KNOWN_SECTORS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(s))
                .map_or_else(|| s.to_string(), |known| known.to_string()),
        ),
    }
}

fn sector_in(sectors: &[&str], sector: &str) -> bool {
    sectors.iter().any(|s| s.eq_ignore_ascii_case(sector))
}

pub fn lookup_etf_backing(symbol: &str) -> Option<EtfBacking> {
    ETF_ASSET_CLASSES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, backing)| *backing)
}

/// Decide the asset class once, from symbol, sector and quote type.
pub fn classify_asset_class(
    symbol: &str,
    sector: Option<&str>,
    quote_type: Option<&str>,
) -> AssetClass {
    let quote = quote_type.map(|q| q.trim().to_ascii_uppercase());
    if quote.as_deref() == Some("CASH") || symbol.to_ascii_uppercase().ends_with(".CASH") {
        return AssetClass::Cash;
    }
    if let Some(backing) = lookup_etf_backing(symbol) {
        return AssetClass::Etf(backing);
    }
    if quote.as_deref() == Some("ETF") {
        return AssetClass::Etf(EtfBacking::Equity);
    }
    match normalize_sector(sector) {
        Some(_) => AssetClass::Equity,
        None if quote.as_deref() == Some("EQUITY") => AssetClass::Equity,
        None => AssetClass::Unknown,
    }
}

pub fn classify_demand(asset_class: AssetClass, sector: Option<&str>) -> DemandProfile {
    if asset_class != AssetClass::Equity {
        return DemandProfile::Unclassified;
    }
    match sector {
        Some(s) if sector_in(EXPORT_SECTORS, s) => DemandProfile::ExportOriented,
        Some(s) if sector_in(DOMESTIC_SECTORS, s) => DemandProfile::DomesticDemand,
        _ => DemandProfile::Unclassified,
    }
}

/// Infer (region, currency) from the ticker suffix. Unsuffixed tickers are US listings.
pub fn infer_market(symbol: &str) -> (&'static str, &'static str) {
    MARKET_SUFFIXES
        .iter()
        .find(|(suffix, _, _)| symbol.ends_with(suffix))
        .map(|(_, region, currency)| (*region, *currency))
        .unwrap_or(("US", "USD"))
}

/// Currency code of a `XXX.CASH` balance.
fn cash_currency(symbol: &str, asset_class: AssetClass) -> Option<String> {
    if !asset_class.is_cash() {
        return None;
    }
    let (code, suffix) = symbol.rsplit_once('.')?;
    (suffix.eq_ignore_ascii_case("CASH")
        && code.len() == 3
        && code.chars().all(|c| c.is_ascii_alphabetic()))
    .then(|| code.to_ascii_uppercase())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: f64,
    pub cost_basis: f64,
    pub currency: String,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub asset_class: AssetClass,
    pub demand: DemandProfile,
    /// Market value in the portfolio's base currency.
    pub market_value: f64,
}

/// Raw snapshot fields before classification.
#[derive(Debug, Clone, Default)]
pub struct HoldingInput {
    pub symbol: String,
    pub shares: f64,
    pub cost_basis: f64,
    pub currency: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub quote_type: Option<String>,
    pub market_value: f64,
}

impl Holding {
    pub fn from_input(input: HoldingInput) -> Result<Self, ShockwiseError> {
        let symbol = input.symbol.trim().to_string();
        if symbol.is_empty() {
            return Err(ShockwiseError::InvalidHolding {
                symbol: input.symbol,
                reason: "symbol is empty".into(),
            });
        }
        if !input.market_value.is_finite() || input.market_value < 0.0 {
            return Err(ShockwiseError::InvalidHolding {
                symbol,
                reason: format!("market value must be non-negative, got {}", input.market_value),
            });
        }
        if !input.shares.is_finite() || input.shares < 0.0 {
            return Err(ShockwiseError::InvalidHolding {
                symbol,
                reason: format!("shares must be non-negative, got {}", input.shares),
            });
        }

        let sector = normalize_sector(input.sector.as_deref());
        let asset_class =
            classify_asset_class(&symbol, sector.as_deref(), input.quote_type.as_deref());
        let demand = classify_demand(asset_class, sector.as_deref());
        let (inferred_region, inferred_currency) = infer_market(&symbol);
        let inferred_currency = cash_currency(&symbol, asset_class)
            .unwrap_or_else(|| inferred_currency.to_string());

        let currency = input
            .currency
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or(inferred_currency);

        let region = if asset_class.is_cash() {
            None
        } else {
            Some(
                input
                    .region
                    .map(|r| r.trim().to_ascii_uppercase())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| inferred_region.to_string()),
            )
        };

        Ok(Holding {
            symbol,
            shares: input.shares,
            cost_basis: input.cost_basis,
            currency,
            sector: if asset_class.is_cash() { None } else { sector },
            region,
            asset_class,
            demand,
            market_value: input.market_value,
        })
    }

    pub fn is_technology(&self) -> bool {
        self.sector
            .as_deref()
            .is_some_and(|s| sector_in(TECHNOLOGY_SECTORS, s))
    }
}
