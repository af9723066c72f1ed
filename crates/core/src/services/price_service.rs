use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::price::PriceObservation;
use crate::models::symbol::Symbol;
use crate::store::traits::PriceStore;

/// Front for the Price Series Store.
///
/// Recording is a pure fact write: prices are not sanity-checked and
/// appends never fail on business grounds. Lookups on unknown symbols
/// yield empty results rather than errors.
pub struct PriceService {
    prices: Arc<dyn PriceStore>,
    suggestion_limit: usize,
}

impl PriceService {
    pub fn new(prices: Arc<dyn PriceStore>, suggestion_limit: usize) -> Self {
        Self {
            prices,
            suggestion_limit,
        }
    }

    /// Record one observation from the external feed.
    pub async fn record(&self, observation: PriceObservation) -> Result<(), CoreError> {
        debug!(
            "Recording {} @ {} = {}",
            observation.symbol, observation.timestamp, observation.price
        );
        self.prices.append(observation).await
    }

    pub async fn latest(&self, symbol: &Symbol) -> Result<Option<PriceObservation>, CoreError> {
        self.prices.latest(symbol).await
    }

    /// Observations in `[from, to)`, ascending.
    pub async fn range(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, CoreError> {
        self.prices.range(symbol, from, to).await
    }

    pub async fn symbol_exists(&self, symbol: &Symbol) -> Result<bool, CoreError> {
        self.prices.symbol_exists(symbol).await
    }

    /// Every symbol with at least one observation, sorted.
    pub async fn known_symbols(&self) -> Result<Vec<Symbol>, CoreError> {
        self.prices.symbols().await
    }

    /// Symbols starting with `query` (case-insensitive), sorted and capped
    /// at the configured suggestion limit. A blank query yields nothing.
    pub async fn suggest_symbols(&self, query: &str) -> Result<Vec<Symbol>, CoreError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let matches: Vec<Symbol> = self
            .prices
            .symbols()
            .await?
            .into_iter()
            .filter(|s| s.starts_with(query))
            .take(self.suggestion_limit)
            .collect();

        debug!("Suggestions for '{}': {} match(es)", query, matches.len());
        Ok(matches)
    }
}
