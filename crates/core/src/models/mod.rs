pub mod holding;
pub mod identity;
pub mod price;
pub mod request;
pub mod settings;
pub mod span;
pub mod symbol;
pub mod valuation;
