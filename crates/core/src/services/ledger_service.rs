use chrono::Utc;
use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::identity::Identity;
use crate::models::symbol::Symbol;
use crate::store::traits::{HoldingsStore, SymbolOracle};

/// The Holdings Ledger: authoritative per-user quantity bookkeeping.
///
/// Business rules (positive amounts, known symbols) are checked here;
/// atomicity of each mutation is delegated to the [`HoldingsStore`].
/// A rejected mutation never reaches the store, so ledger state is left
/// untouched.
pub struct LedgerService {
    holdings: Arc<dyn HoldingsStore>,
    symbols: Arc<dyn SymbolOracle>,
}

impl LedgerService {
    pub fn new(holdings: Arc<dyn HoldingsStore>, symbols: Arc<dyn SymbolOracle>) -> Self {
        Self { holdings, symbols }
    }

    /// Add `amount` units of `symbol` to the caller's holdings, creating the
    /// holding on first acquisition.
    ///
    /// Rules:
    /// - `amount` must be positive (`InvalidQuantity`)
    /// - `symbol` must be known to the symbol oracle (`UnknownSymbol`)
    pub async fn increment(
        &self,
        identity: &Identity,
        symbol: &Symbol,
        amount: Decimal,
    ) -> Result<Holding, CoreError> {
        validate_amount(amount)?;

        if !self.symbols.symbol_exists(symbol).await? {
            return Err(CoreError::UnknownSymbol(symbol.to_string()));
        }

        let holding = self
            .holdings
            .increment(identity.user_id(), symbol, amount, Utc::now())
            .await?;

        info!(
            "Holding {} of {} increased by {} to {}",
            symbol,
            identity.user_id(),
            amount,
            holding.quantity
        );
        Ok(holding)
    }

    /// Remove `amount` units. Returns `None` when the holding reached zero
    /// and was deleted.
    pub async fn decrement(
        &self,
        identity: &Identity,
        symbol: &Symbol,
        amount: Decimal,
    ) -> Result<Option<Holding>, CoreError> {
        validate_amount(amount)?;

        let remaining = self
            .holdings
            .decrement(identity.user_id(), symbol, amount)
            .await?;

        match &remaining {
            Some(holding) => info!(
                "Holding {} of {} decreased by {} to {}",
                symbol,
                identity.user_id(),
                amount,
                holding.quantity
            ),
            None => info!(
                "Holding {} of {} decreased by {} to zero and removed",
                symbol,
                identity.user_id(),
                amount
            ),
        }
        Ok(remaining)
    }

    /// Delete a holding outright. Absent holdings are not an error.
    pub async fn remove(&self, identity: &Identity, symbol: &Symbol) -> Result<(), CoreError> {
        let removed = self.holdings.remove(identity.user_id(), symbol).await?;
        if removed {
            info!("Holding {} of {} removed", symbol, identity.user_id());
        } else {
            debug!("No holding {} of {} to remove", symbol, identity.user_id());
        }
        Ok(())
    }

    /// Look up one holding of the caller.
    pub async fn get(
        &self,
        identity: &Identity,
        symbol: &Symbol,
    ) -> Result<Option<Holding>, CoreError> {
        self.holdings.get(identity.user_id(), symbol).await
    }

    /// All holdings of the caller, in no particular order.
    pub async fn list_for_user(&self, identity: &Identity) -> Result<Vec<Holding>, CoreError> {
        self.holdings.list_for_user(identity.user_id()).await
    }
}

fn validate_amount(amount: Decimal) -> Result<(), CoreError> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidQuantity(format!(
            "{amount} must be greater than zero"
        )));
    }
    Ok(())
}
