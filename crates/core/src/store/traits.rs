use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::identity::UserId;
use crate::models::price::PriceObservation;
use crate::models::symbol::Symbol;

/// Persistence seam for per-user quantity counters.
///
/// Implementations own the atomicity guarantees: each mutation on a
/// `(user, symbol)` key is one indivisible read-modify-write, never a
/// separate read and write issued by the caller. Mutations on different
/// keys may run in parallel. A mutation abandoned before completion must
/// leave the stored quantity unchanged.
///
/// Adapter failures surface as `CoreError::StorageUnavailable`.
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    /// Add `amount` to the holding, creating it with `created_at` if absent.
    /// Returns the holding after the update.
    async fn increment(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Holding, CoreError>;

    /// Subtract `amount`, deleting the holding when it reaches zero.
    ///
    /// Returns the remaining holding, or `None` if it was deleted.
    /// Fails with `InsufficientQuantity` (state untouched) if `amount`
    /// exceeds the held quantity, including when nothing is held.
    async fn decrement(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
        amount: Decimal,
    ) -> Result<Option<Holding>, CoreError>;

    /// Delete the holding if present. Returns whether anything was removed.
    async fn remove(&self, user_id: &UserId, symbol: &Symbol) -> Result<bool, CoreError>;

    /// Look up a single holding.
    async fn get(&self, user_id: &UserId, symbol: &Symbol) -> Result<Option<Holding>, CoreError>;

    /// All holdings of a user, in no particular order.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Holding>, CoreError>;
}

/// Persistence seam for the append-only price history.
///
/// Reads are consistent as of their own execution; a concurrent append may
/// or may not be visible to them.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Record one observation. Never rejects on business grounds.
    async fn append(&self, observation: PriceObservation) -> Result<(), CoreError>;

    /// Observation with the greatest timestamp; on equal timestamps the
    /// most recently inserted one, counting a re-delivered older price as a
    /// new insertion. `None` for unknown symbols.
    async fn latest(&self, symbol: &Symbol) -> Result<Option<PriceObservation>, CoreError>;

    /// Up to `n` most recent observations, newest first.
    async fn recent(&self, symbol: &Symbol, n: usize)
        -> Result<Vec<PriceObservation>, CoreError>;

    /// Observations with `from <= timestamp < to`, ascending by timestamp.
    /// Empty for unknown symbols.
    async fn range(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, CoreError>;

    /// Whether the symbol has at least one observation.
    async fn symbol_exists(&self, symbol: &Symbol) -> Result<bool, CoreError>;

    /// Every symbol with at least one observation, sorted.
    async fn symbols(&self) -> Result<Vec<Symbol>, CoreError>;
}

/// Answers "is this a tradable symbol?" for ledger validation.
#[async_trait]
pub trait SymbolOracle: Send + Sync {
    async fn symbol_exists(&self, symbol: &Symbol) -> Result<bool, CoreError>;
}
