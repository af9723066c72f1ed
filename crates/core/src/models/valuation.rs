use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::identity::UserId;
use super::symbol::Symbol;

/// Point-in-time valuation of a user's full holdings set.
///
/// Recomputed on every request; never persisted or cached by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    /// Whose holdings were valued
    pub user_id: UserId,

    /// When the computation ran
    pub as_of: DateTime<Utc>,

    /// Per-holding lines, largest value first
    pub holdings: Vec<HoldingValuation>,

    /// Sum of all line values
    pub grand_total: Decimal,
}

impl PortfolioSnapshot {
    /// Line for a given symbol, if the user holds it.
    #[must_use]
    pub fn holding(&self, symbol: &Symbol) -> Option<&HoldingValuation> {
        self.holdings.iter().find(|h| &h.symbol == symbol)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// Valuation of a single holding inside a [`PortfolioSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub symbol: Symbol,

    pub quantity: Decimal,

    /// Latest recorded price, zero when `price_unavailable`
    pub resolved_price: Decimal,

    /// Timestamp of the observation the price came from
    pub priced_at: Option<DateTime<Utc>>,

    /// `quantity × resolved_price`
    pub value: Decimal,

    /// `value / grand_total`, zero when the grand total is zero
    pub weight: Decimal,

    /// Set when the symbol has no observations at all
    pub price_unavailable: bool,
}

/// Day-over-day performance of a user's holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChange {
    pub current_total: Decimal,
    pub prior_total: Decimal,
    /// `current_total - prior_total`
    pub diff: Decimal,
    /// Percentage change; see `ValuationService::daily_change` for the
    /// zero-denominator rule
    pub percent: Decimal,
    /// Per-symbol breakdown, ordered by symbol
    pub symbols: Vec<SymbolChange>,
}

/// Contribution of one held symbol to a [`DailyChange`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolChange {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub current_price: Decimal,
    pub prior_price: Decimal,
    pub current_value: Decimal,
    pub prior_value: Decimal,
}
