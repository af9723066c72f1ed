use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Default cap on symbol suggestions.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Default cap on symbols per price-series request.
pub const DEFAULT_MAX_SERIES_SYMBOLS: usize = 50;

/// Tunables for a `StockLedger` instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of symbols returned by `suggest_symbols`.
    pub suggestion_limit: usize,

    /// Maximum number of distinct symbols accepted by one price-series request.
    pub max_series_symbols: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            max_series_symbols: DEFAULT_MAX_SERIES_SYMBOLS,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        if settings.max_series_symbols == 0 {
            return Err(CoreError::Validation(
                "max_series_symbols must be at least 1".into(),
            ));
        }
        Ok(settings)
    }
}
