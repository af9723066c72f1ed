pub mod errors;
pub mod models;
pub mod services;
pub mod storage;
pub mod store;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use models::{
    holding::Holding,
    identity::Identity,
    price::{PriceObservation, PriceSeries},
    request::{parse_price, parse_quantity, Request, Response},
    settings::Settings,
    span::TimeSpan,
    symbol::Symbol,
    valuation::{DailyChange, PortfolioSnapshot},
};
use rust_decimal::Decimal;
use services::{
    ledger_service::LedgerService, price_service::PriceService,
    valuation_service::ValuationService,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use store::{
    HoldingsStore, InMemoryHoldingsStore, InMemoryPriceStore, PriceStore, PriceStoreOracle,
    SymbolOracle,
};

use errors::CoreError;

/// Main entry point for the Stock Ledger core library.
///
/// Wires the Holdings Ledger, the Price Series Store and the Valuation
/// Engine over shared store handles. Every method takes `&self`, so one
/// instance can serve concurrent requests behind an `Arc`.
#[must_use]
pub struct StockLedger {
    settings: Settings,
    ledger_service: LedgerService,
    price_service: PriceService,
    valuation_service: ValuationService,
}

impl std::fmt::Debug for StockLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockLedger")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StockLedger {
    /// Build over the given stores with default settings. Symbol existence
    /// is answered by the price store.
    pub fn new(holdings: Arc<dyn HoldingsStore>, prices: Arc<dyn PriceStore>) -> Self {
        Self::with_settings(holdings, prices, Settings::default())
    }

    /// Build over the given stores with custom settings.
    pub fn with_settings(
        holdings: Arc<dyn HoldingsStore>,
        prices: Arc<dyn PriceStore>,
        settings: Settings,
    ) -> Self {
        let oracle = Arc::new(PriceStoreOracle::new(prices.clone()));
        Self::with_oracle(holdings, prices, oracle, settings)
    }

    /// Build with an external symbol-existence oracle (e.g. a reference-data
    /// service) instead of the price store.
    pub fn with_oracle(
        holdings: Arc<dyn HoldingsStore>,
        prices: Arc<dyn PriceStore>,
        oracle: Arc<dyn SymbolOracle>,
        settings: Settings,
    ) -> Self {
        Self {
            ledger_service: LedgerService::new(holdings.clone(), oracle),
            price_service: PriceService::new(prices.clone(), settings.suggestion_limit),
            valuation_service: ValuationService::new(holdings, prices),
            settings,
        }
    }

    /// Create a ledger backed by fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryHoldingsStore::new()),
            Arc::new(InMemoryPriceStore::new()),
        )
    }

    /// Get current settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Holdings Ledger ─────────────────────────────────────────────

    /// Add units of a known symbol to the caller's holdings.
    pub async fn add_holding(
        &self,
        identity: &Identity,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<Holding, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.ledger_service
            .increment(identity, &symbol, quantity)
            .await
    }

    /// Remove units from a holding. Returns `None` if it dropped to zero
    /// and was deleted.
    pub async fn decrease_holding(
        &self,
        identity: &Identity,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<Option<Holding>, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.ledger_service
            .decrement(identity, &symbol, quantity)
            .await
    }

    /// Delete a holding. Succeeds whether or not it existed.
    pub async fn remove_holding(&self, identity: &Identity, symbol: &str) -> Result<(), CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.ledger_service.remove(identity, &symbol).await
    }

    /// All holdings of the caller, in no particular order.
    pub async fn list_holdings(&self, identity: &Identity) -> Result<Vec<Holding>, CoreError> {
        self.ledger_service.list_for_user(identity).await
    }

    /// A single holding of the caller.
    pub async fn get_holding(
        &self,
        identity: &Identity,
        symbol: &str,
    ) -> Result<Option<Holding>, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.ledger_service.get(identity, &symbol).await
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Current valuation of the caller's holdings.
    pub async fn get_snapshot(&self, identity: &Identity) -> Result<PortfolioSnapshot, CoreError> {
        self.valuation_service.snapshot(identity).await
    }

    /// Day-over-day change of the caller's holdings.
    pub async fn get_daily_change(&self, identity: &Identity) -> Result<DailyChange, CoreError> {
        self.valuation_service.daily_change(identity).await
    }

    /// Price series for each requested symbol over `span`, ending now.
    pub async fn get_price_series<S: AsRef<str>>(
        &self,
        symbols: &[S],
        span: TimeSpan,
    ) -> Result<BTreeMap<Symbol, PriceSeries>, CoreError> {
        self.get_price_series_as_of(symbols, span, Utc::now()).await
    }

    /// Price series for each requested symbol over `span`, ending at `now`.
    pub async fn get_price_series_as_of<S: AsRef<str>>(
        &self,
        symbols: &[S],
        span: TimeSpan,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<Symbol, PriceSeries>, CoreError> {
        let symbols = self.validate_series_symbols(symbols)?;
        self.valuation_service
            .time_series_as_of(&symbols, span, now)
            .await
    }

    // ── Prices ──────────────────────────────────────────────────────

    /// Record one price observation (external feed entry point).
    pub async fn record_price(
        &self,
        symbol: &str,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.price_service
            .record(PriceObservation::new(symbol, price, timestamp))
            .await
    }

    /// Latest observation of a symbol, if any.
    pub async fn latest_price(&self, symbol: &str) -> Result<Option<PriceObservation>, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.price_service.latest(&symbol).await
    }

    /// Known symbols starting with `query`.
    pub async fn suggest_symbols(&self, query: &str) -> Result<Vec<Symbol>, CoreError> {
        self.price_service.suggest_symbols(query).await
    }

    /// Every symbol with at least one observation.
    pub async fn known_symbols(&self) -> Result<Vec<Symbol>, CoreError> {
        self.price_service.known_symbols().await
    }

    // ── Boundary ────────────────────────────────────────────────────

    /// Validate and dispatch a decoded boundary request.
    ///
    /// User-scoped requests fail with `NotAuthenticated` when no identity
    /// was resolved for the caller.
    pub async fn handle(
        &self,
        identity: Option<&Identity>,
        request: Request,
    ) -> Result<Response, CoreError> {
        let identity = match (identity, request.requires_identity()) {
            (None, true) => {
                warn!("Rejecting unauthenticated {request:?}");
                return Err(CoreError::NotAuthenticated);
            }
            (identity, _) => identity,
        };
        debug!("Handling {request:?}");

        self.dispatch(identity, request).await.inspect_err(|e| {
            if let CoreError::StorageUnavailable(reason) = e {
                warn!("Request failed on storage: {reason}");
            }
        })
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn dispatch(
        &self,
        identity: Option<&Identity>,
        request: Request,
    ) -> Result<Response, CoreError> {
        match request {
            Request::AddHolding { symbol, quantity } => {
                let quantity = parse_quantity(&quantity)?;
                let holding = self
                    .add_holding(Self::require(identity)?, &symbol, quantity)
                    .await?;
                Ok(Response::Holding(holding))
            }
            Request::DecreaseHolding { symbol, quantity } => {
                let quantity = parse_quantity(&quantity)?;
                let remaining = self
                    .decrease_holding(Self::require(identity)?, &symbol, quantity)
                    .await?;
                Ok(Response::HoldingDecreased(remaining))
            }
            Request::RemoveHolding { symbol } => {
                self.remove_holding(Self::require(identity)?, &symbol).await?;
                Ok(Response::Removed)
            }
            Request::ListHoldings => Ok(Response::Holdings(
                self.list_holdings(Self::require(identity)?).await?,
            )),
            Request::GetSnapshot => Ok(Response::Snapshot(
                self.get_snapshot(Self::require(identity)?).await?,
            )),
            Request::GetDailyChange => Ok(Response::DailyChange(
                self.get_daily_change(Self::require(identity)?).await?,
            )),
            Request::GetPriceSeries { symbols, span } => {
                let span = match span {
                    Some(label) => label.parse()?,
                    None => TimeSpan::All,
                };
                Ok(Response::PriceSeries(
                    self.get_price_series(symbols.as_slice(), span).await?,
                ))
            }
            Request::RecordPrice {
                symbol,
                price,
                timestamp,
            } => {
                let price = parse_price(&price)?;
                self.record_price(&symbol, price, timestamp).await?;
                Ok(Response::Recorded)
            }
            Request::SuggestSymbols { query } => {
                Ok(Response::Symbols(self.suggest_symbols(&query).await?))
            }
            Request::KnownSymbols => Ok(Response::Symbols(self.known_symbols().await?)),
        }
    }

    fn require(identity: Option<&Identity>) -> Result<&Identity, CoreError> {
        identity.ok_or(CoreError::NotAuthenticated)
    }

    fn validate_series_symbols<S: AsRef<str>>(
        &self,
        symbols: &[S],
    ) -> Result<Vec<Symbol>, CoreError> {
        let mut parsed = symbols
            .iter()
            .map(|s| Symbol::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        parsed.sort();
        parsed.dedup();

        if parsed.len() > self.settings.max_series_symbols {
            return Err(CoreError::Validation(format!(
                "Requested {} symbols, maximum is {}",
                parsed.len(),
                self.settings.max_series_symbols
            )));
        }
        Ok(parsed)
    }
}
