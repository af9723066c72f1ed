use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Ticker symbol of a tradable security, trimmed and upper-cased
/// (e.g. "AAPL", "MSFT").
///
/// Normalisation happens on every construction path, including
/// deserialization, so `Symbol` values compare equal regardless of the
/// casing a caller or feed used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_uppercase())
    }

    /// Boundary constructor: rejects symbols that are empty after trimming.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let symbol = Self::new(raw);
        if symbol.0.is_empty() {
            return Err(CoreError::Validation("Symbol must not be empty".into()));
        }
        Ok(symbol)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive prefix match used by symbol suggestions.
    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(&prefix.trim().to_uppercase())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Symbol {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}
