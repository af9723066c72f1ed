use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::hash_map;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::identity::UserId;
use crate::models::price::{ObservationLog, PriceObservation};
use crate::models::symbol::Symbol;

use super::traits::{HoldingsStore, PriceStore, SymbolOracle};

fn insufficient(symbol: &Symbol, requested: Decimal, held: Decimal) -> CoreError {
    CoreError::InsufficientQuantity {
        symbol: symbol.to_string(),
        requested,
        held,
    }
}

// ═══════════════════════════════════════════════════════════════════
// Holdings
// ═══════════════════════════════════════════════════════════════════

/// Process-local holdings store.
///
/// Holdings are sharded per user: every mutation runs while holding that
/// user's shard entry, so read-modify-write on a `(user, symbol)` key is
/// atomic and contains no suspension point. Different users proceed in
/// parallel.
#[derive(Debug, Default)]
pub struct InMemoryHoldingsStore {
    holdings: DashMap<UserId, HashMap<Symbol, Holding>>,
}

impl InMemoryHoldingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously exported holdings.
    /// Records with a non-positive quantity are skipped.
    pub fn from_holdings(holdings: impl IntoIterator<Item = Holding>) -> Self {
        let store = Self::new();
        for holding in holdings {
            if holding.quantity <= Decimal::ZERO {
                warn!(
                    "Skipping holding {} of {} with non-positive quantity {}",
                    holding.symbol, holding.user_id, holding.quantity
                );
                continue;
            }
            store
                .holdings
                .entry(holding.user_id.clone())
                .or_default()
                .insert(holding.symbol.clone(), holding);
        }
        store
    }

    /// Copy of every holding, ordered by user then symbol.
    #[must_use]
    pub fn all_holdings(&self) -> Vec<Holding> {
        let mut all: Vec<Holding> = self
            .holdings
            .iter()
            .flat_map(|user| user.value().values().cloned().collect::<Vec<_>>())
            .collect();
        all.sort_by(|a, b| {
            a.user_id
                .cmp(&b.user_id)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        all
    }
}

#[async_trait]
impl HoldingsStore for InMemoryHoldingsStore {
    async fn increment(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Holding, CoreError> {
        let mut user_holdings = self.holdings.entry(user_id.clone()).or_default();

        match user_holdings.entry(symbol.clone()) {
            hash_map::Entry::Occupied(mut entry) => {
                let updated = entry.get().quantity.checked_add(amount).ok_or_else(|| {
                    CoreError::InvalidQuantity(format!(
                        "adding {amount} to {symbol} overflows the held quantity"
                    ))
                })?;
                entry.get_mut().quantity = updated;
                Ok(entry.get().clone())
            }
            hash_map::Entry::Vacant(entry) => {
                let holding = Holding::new(user_id.clone(), symbol.clone(), amount, created_at);
                Ok(entry.insert(holding).clone())
            }
        }
    }

    async fn decrement(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
        amount: Decimal,
    ) -> Result<Option<Holding>, CoreError> {
        let Entry::Occupied(mut user_entry) = self.holdings.entry(user_id.clone()) else {
            return Err(insufficient(symbol, amount, Decimal::ZERO));
        };

        {
            let user_holdings = user_entry.get_mut();
            let Some(holding) = user_holdings.get_mut(symbol) else {
                return Err(insufficient(symbol, amount, Decimal::ZERO));
            };
            if amount > holding.quantity {
                return Err(insufficient(symbol, amount, holding.quantity));
            }
            holding.quantity -= amount;
            if !holding.quantity.is_zero() {
                return Ok(Some(holding.clone()));
            }
            user_holdings.remove(symbol);
        }

        if user_entry.get().is_empty() {
            user_entry.remove();
        }
        Ok(None)
    }

    async fn remove(&self, user_id: &UserId, symbol: &Symbol) -> Result<bool, CoreError> {
        let Entry::Occupied(mut user_entry) = self.holdings.entry(user_id.clone()) else {
            return Ok(false);
        };
        let removed = user_entry.get_mut().remove(symbol).is_some();
        if user_entry.get().is_empty() {
            user_entry.remove();
        }
        Ok(removed)
    }

    async fn get(&self, user_id: &UserId, symbol: &Symbol) -> Result<Option<Holding>, CoreError> {
        Ok(self
            .holdings
            .get(user_id)
            .and_then(|user| user.get(symbol).cloned()))
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Holding>, CoreError> {
        Ok(self
            .holdings
            .get(user_id)
            .map(|user| user.values().cloned().collect())
            .unwrap_or_default())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Prices
// ═══════════════════════════════════════════════════════════════════

/// Process-local price history, one sorted [`ObservationLog`] per symbol.
#[derive(Debug, Default)]
pub struct InMemoryPriceStore {
    series: DashMap<Symbol, ObservationLog>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously exported observations, replaying
    /// them in the given order.
    pub fn from_observations(observations: impl IntoIterator<Item = PriceObservation>) -> Self {
        let store = Self::new();
        for observation in observations {
            store.insert(&observation);
        }
        store
    }

    /// Copy of every observation, grouped by symbol and ordered by
    /// timestamp (insertion order on ties).
    #[must_use]
    pub fn all_observations(&self) -> Vec<PriceObservation> {
        let mut symbols: Vec<Symbol> = self.series.iter().map(|e| e.key().clone()).collect();
        symbols.sort();

        let mut all = Vec::new();
        for symbol in symbols {
            if let Some(log) = self.series.get(&symbol) {
                all.extend(
                    log.iter()
                        .map(|p| PriceObservation::new(symbol.clone(), p.price, p.timestamp)),
                );
            }
        }
        all
    }

    /// Get the total number of observations across all symbols.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.series.iter().map(|e| e.value().len()).sum()
    }

    fn insert(&self, observation: &PriceObservation) -> bool {
        self.series
            .entry(observation.symbol.clone())
            .or_default()
            .insert(observation.point())
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn append(&self, observation: PriceObservation) -> Result<(), CoreError> {
        if !self.insert(&observation) {
            debug!(
                "Ignoring duplicate observation {} @ {} = {}",
                observation.symbol, observation.timestamp, observation.price
            );
        }
        Ok(())
    }

    async fn latest(&self, symbol: &Symbol) -> Result<Option<PriceObservation>, CoreError> {
        Ok(self.series.get(symbol).and_then(|log| {
            log.latest()
                .map(|p| PriceObservation::new(symbol.clone(), p.price, p.timestamp))
        }))
    }

    async fn recent(
        &self,
        symbol: &Symbol,
        n: usize,
    ) -> Result<Vec<PriceObservation>, CoreError> {
        Ok(self
            .series
            .get(symbol)
            .map(|log| {
                log.recent(n)
                    .map(|p| PriceObservation::new(symbol.clone(), p.price, p.timestamp))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn range(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, CoreError> {
        Ok(self
            .series
            .get(symbol)
            .map(|log| {
                log.range(from, to)
                    .iter()
                    .map(|p| PriceObservation::new(symbol.clone(), p.price, p.timestamp))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn symbol_exists(&self, symbol: &Symbol) -> Result<bool, CoreError> {
        Ok(self.series.get(symbol).is_some_and(|log| !log.is_empty()))
    }

    async fn symbols(&self) -> Result<Vec<Symbol>, CoreError> {
        let mut symbols: Vec<Symbol> = self
            .series
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| e.key().clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Symbol oracle backed by a price store: a symbol is tradable once the
/// feed has recorded at least one observation for it.
#[derive(Clone)]
pub struct PriceStoreOracle {
    prices: Arc<dyn PriceStore>,
}

impl PriceStoreOracle {
    pub fn new(prices: Arc<dyn PriceStore>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl SymbolOracle for PriceStoreOracle {
    async fn symbol_exists(&self, symbol: &Symbol) -> Result<bool, CoreError> {
        self.prices.symbol_exists(symbol).await
    }
}
