pub mod memory;
pub mod traits;

pub use memory::{InMemoryHoldingsStore, InMemoryPriceStore, PriceStoreOracle};
pub use traits::{HoldingsStore, PriceStore, SymbolOracle};
