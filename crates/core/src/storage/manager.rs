use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::price::PriceObservation;
use crate::store::memory::{InMemoryHoldingsStore, InMemoryPriceStore};

use super::format;

/// Everything the in-memory stores hold, in a serializable shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// All holdings, ordered by user then symbol
    pub holdings: Vec<Holding>,

    /// All price observations, grouped by symbol in timestamp order
    pub observations: Vec<PriceObservation>,
}

impl LedgerState {
    /// Copy the current contents of both stores.
    pub fn capture(holdings: &InMemoryHoldingsStore, prices: &InMemoryPriceStore) -> Self {
        Self {
            holdings: holdings.all_holdings(),
            observations: prices.all_observations(),
        }
    }

    /// Rebuild fresh stores from this state.
    pub fn into_stores(self) -> (InMemoryHoldingsStore, InMemoryPriceStore) {
        (
            InMemoryHoldingsStore::from_holdings(self.holdings),
            InMemoryPriceStore::from_observations(self.observations),
        )
    }
}

/// High-level storage operations: save/load ledger state to/from bytes or files.
pub struct StorageManager;

impl StorageManager {
    /// Serialize ledger state to raw bytes.
    ///
    /// Flow: LedgerState → bincode → SLDG format bytes
    pub fn save_to_bytes(state: &LedgerState) -> Result<Vec<u8>, CoreError> {
        let payload = bincode::serialize(state)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))?;
        Ok(format::write_file(format::CURRENT_VERSION, &payload))
    }

    /// Deserialize ledger state from raw bytes.
    ///
    /// Flow: SLDG bytes → parse header → bincode → LedgerState
    pub fn load_from_bytes(data: &[u8]) -> Result<LedgerState, CoreError> {
        let (_header, payload) = format::read_file(data)?;
        bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize ledger: {e}")))
    }

    /// Save ledger state to a file on disk.
    pub fn save_to_file(state: &LedgerState, path: &str) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(state)?;
        std::fs::write(path, bytes)?;
        info!(
            "Saved {} holding(s) and {} observation(s) to {}",
            state.holdings.len(),
            state.observations.len(),
            path
        );
        Ok(())
    }

    /// Load ledger state from a file on disk.
    pub fn load_from_file(path: &str) -> Result<LedgerState, CoreError> {
        let bytes = std::fs::read(path)?;
        let state = Self::load_from_bytes(&bytes)?;
        info!(
            "Loaded {} holding(s) and {} observation(s) from {}",
            state.holdings.len(),
            state.observations.len(),
            path
        );
        Ok(state)
    }
}
