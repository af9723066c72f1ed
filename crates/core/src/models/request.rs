use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::errors::CoreError;

use super::holding::Holding;
use super::price::PriceSeries;
use super::symbol::Symbol;
use super::valuation::{DailyChange, PortfolioSnapshot};

/// One boundary request, as decoded from a transport envelope.
///
/// Quantities and prices stay untyped JSON here; they are checked and
/// converted to `Decimal` before anything reaches the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    AddHolding {
        symbol: String,
        quantity: Value,
    },
    DecreaseHolding {
        symbol: String,
        quantity: Value,
    },
    RemoveHolding {
        symbol: String,
    },
    ListHoldings,
    GetSnapshot,
    GetDailyChange,
    GetPriceSeries {
        symbols: Vec<String>,
        #[serde(default)]
        span: Option<String>,
    },
    RecordPrice {
        symbol: String,
        price: Value,
        timestamp: DateTime<Utc>,
    },
    SuggestSymbols {
        query: String,
    },
    KnownSymbols,
}

impl Request {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Malformed request: {e}")))
    }

    /// Whether the request acts on a particular user's ledger.
    #[must_use]
    pub fn requires_identity(&self) -> bool {
        matches!(
            self,
            Request::AddHolding { .. }
                | Request::DecreaseHolding { .. }
                | Request::RemoveHolding { .. }
                | Request::ListHoldings
                | Request::GetSnapshot
                | Request::GetDailyChange
        )
    }
}

/// Result of a handled [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Response {
    Holding(Holding),
    /// `None` when the decrement removed the holding entirely
    HoldingDecreased(Option<Holding>),
    Removed,
    Holdings(Vec<Holding>),
    Snapshot(PortfolioSnapshot),
    DailyChange(DailyChange),
    PriceSeries(BTreeMap<Symbol, PriceSeries>),
    Recorded,
    Symbols(Vec<Symbol>),
}

/// Parse a JSON number or numeric string into a `Decimal`.
fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Validate a holding quantity: must be numeric and strictly positive.
pub fn parse_quantity(value: &Value) -> Result<Decimal, CoreError> {
    let quantity = decimal_from_value(value)
        .ok_or_else(|| CoreError::InvalidQuantity(format!("'{value}' is not a number")))?;
    if quantity <= Decimal::ZERO {
        return Err(CoreError::InvalidQuantity(format!(
            "{quantity} must be greater than zero"
        )));
    }
    Ok(quantity)
}

/// Validate a recorded price: must be numeric, any sign is accepted.
pub fn parse_price(value: &Value) -> Result<Decimal, CoreError> {
    decimal_from_value(value)
        .ok_or_else(|| CoreError::Validation(format!("Price '{value}' is not a number")))
}
