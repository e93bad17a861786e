//! Domain error types.

/// Top-level error type for shockwise.
#[derive(Debug, thiserror::Error)]
pub enum ShockwiseError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("unknown scenario: {name}")]
    UnknownScenario { name: String },

    #[error("invalid shock {shock}: must be a finite move no worse than -100%")]
    InvalidShock { shock: f64 },

    #[error("invalid scenario catalog: {reason}")]
    InvalidCatalog { reason: String },

    #[error("unknown strategy preset: {name}")]
    UnknownStrategy { name: String },

    #[error("invalid strategy threshold {field}: {reason}")]
    InvalidStrategy { field: String, reason: String },

    #[error("portfolio is empty")]
    EmptyPortfolio,

    #[error("duplicate holding symbol: {symbol}")]
    DuplicateSymbol { symbol: String },

    #[error("invalid holding {symbol}: {reason}")]
    InvalidHolding { symbol: String, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&ShockwiseError> for std::process::ExitCode {
    fn from(err: &ShockwiseError) -> Self {
        let code: u8 = match err {
            ShockwiseError::Io(_) => 1,
            ShockwiseError::ConfigParse { .. }
            | ShockwiseError::ConfigMissing { .. }
            | ShockwiseError::ConfigInvalid { .. } => 2,
            ShockwiseError::Data { .. }
            | ShockwiseError::NoData { .. }
            | ShockwiseError::Csv(_) => 3,
            ShockwiseError::UnknownScenario { .. }
            | ShockwiseError::InvalidShock { .. }
            | ShockwiseError::InvalidCatalog { .. }
            | ShockwiseError::UnknownStrategy { .. }
            | ShockwiseError::InvalidStrategy { .. } => 4,
            ShockwiseError::EmptyPortfolio
            | ShockwiseError::DuplicateSymbol { .. }
            | ShockwiseError::InvalidHolding { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scenario_message_names_input() {
        let err = ShockwiseError::UnknownScenario {
            name: "alien invasion".into(),
        };
        assert_eq!(err.to_string(), "unknown scenario: alien invasion");
    }

    #[test]
    fn config_missing_message() {
        let err = ShockwiseError::ConfigMissing {
            section: "portfolio".into(),
            key: "path".into(),
        };
        assert_eq!(err.to_string(), "missing config key [portfolio] path");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ShockwiseError = io.into();
        assert!(matches!(err, ShockwiseError::Io(_)));
    }
}
