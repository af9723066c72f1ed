use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the entire stock-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Ledger / Validation ─────────────────────────────────────────
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Insufficient quantity of {symbol}: requested {requested}, held {held}")]
    InsufficientQuantity {
        symbol: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    // ── Boundary ────────────────────────────────────────────────────
    #[error("User not authenticated")]
    NotAuthenticated,

    // ── Storage adapters ────────────────────────────────────────────
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    // ── Snapshot persistence ────────────────────────────────────────
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),
}

impl CoreError {
    /// Caller mistakes that must never be retried.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidQuantity(_)
                | CoreError::UnknownSymbol(_)
                | CoreError::InsufficientQuantity { .. }
                | CoreError::Validation(_)
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}
