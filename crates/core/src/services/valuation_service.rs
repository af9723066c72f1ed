use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::identity::{Identity, UserId};
use crate::models::price::{PriceObservation, PriceSeries};
use crate::models::span::TimeSpan;
use crate::models::symbol::Symbol;
use crate::models::valuation::{DailyChange, HoldingValuation, PortfolioSnapshot, SymbolChange};
use crate::store::traits::{HoldingsStore, PriceStore};

/// The Valuation Engine: joins holdings with price history at read time.
///
/// Owns no state. Store reads happen first; all joins and arithmetic then
/// run in memory over the fetched data, so a request either completes
/// with a full result or fails with the first storage or overflow error.
pub struct ValuationService {
    holdings: Arc<dyn HoldingsStore>,
    prices: Arc<dyn PriceStore>,
}

impl ValuationService {
    pub fn new(holdings: Arc<dyn HoldingsStore>, prices: Arc<dyn PriceStore>) -> Self {
        Self { holdings, prices }
    }

    /// Value every holding of the caller at its latest recorded price.
    ///
    /// A held symbol without any observation contributes a zero-value line
    /// flagged `price_unavailable` instead of failing the whole snapshot.
    pub async fn snapshot(&self, identity: &Identity) -> Result<PortfolioSnapshot, CoreError> {
        let holdings = self.holdings.list_for_user(identity.user_id()).await?;

        let mut latest = HashMap::with_capacity(holdings.len());
        for holding in &holdings {
            if let Some(observation) = self.prices.latest(&holding.symbol).await? {
                latest.insert(holding.symbol.clone(), observation);
            }
        }

        debug!(
            "Valuing {} holding(s) of {} ({} priced)",
            holdings.len(),
            identity.user_id(),
            latest.len()
        );
        compute_snapshot(identity.user_id().clone(), holdings, &latest, Utc::now())
    }

    /// Day-over-day change of the caller's holdings, using the two most
    /// recent observations of each held symbol.
    ///
    /// `percent` is `diff / prior_total × 100` when `prior_total > 0`;
    /// otherwise it is `100` if `current_total > 0` and `0` if not.
    pub async fn daily_change(&self, identity: &Identity) -> Result<DailyChange, CoreError> {
        let holdings = self.holdings.list_for_user(identity.user_id()).await?;

        let mut observations = Vec::new();
        for holding in &holdings {
            observations.extend(self.prices.recent(&holding.symbol, 2).await?);
        }

        compute_daily_change(&holdings, &group_by_symbol(observations))
    }

    /// Chart series for each requested symbol over `span`, ending now.
    pub async fn time_series(
        &self,
        symbols: &[Symbol],
        span: TimeSpan,
    ) -> Result<BTreeMap<Symbol, PriceSeries>, CoreError> {
        self.time_series_as_of(symbols, span, Utc::now()).await
    }

    /// Chart series for each requested symbol over `[span start, now)`.
    ///
    /// Every requested symbol gets an entry; unknown symbols map to an empty
    /// series. Points are not resampled or interpolated.
    pub async fn time_series_as_of(
        &self,
        symbols: &[Symbol],
        span: TimeSpan,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<Symbol, PriceSeries>, CoreError> {
        let start = span.start_at(now);
        let requested: BTreeSet<&Symbol> = symbols.iter().collect();

        let mut observations = Vec::new();
        for symbol in &requested {
            observations.extend(self.prices.range(symbol, start, now).await?);
        }
        let mut grouped = group_by_symbol(observations);

        let series = requested
            .into_iter()
            .map(|symbol| {
                let series = match grouped.remove(symbol) {
                    Some(observations) => PriceSeries {
                        symbol: symbol.clone(),
                        points: observations.iter().map(PriceObservation::point).collect(),
                    },
                    None => PriceSeries::empty(symbol.clone()),
                };
                (symbol.clone(), series)
            })
            .collect();

        debug!("Built {span} series from {start} to {now}");
        Ok(series)
    }
}

/// Partition observations by symbol, keeping each symbol's observations in
/// the order they were given.
pub fn group_by_symbol(
    observations: impl IntoIterator<Item = PriceObservation>,
) -> BTreeMap<Symbol, Vec<PriceObservation>> {
    let mut grouped: BTreeMap<Symbol, Vec<PriceObservation>> = BTreeMap::new();
    for observation in observations {
        grouped
            .entry(observation.symbol.clone())
            .or_default()
            .push(observation);
    }
    grouped
}

/// Pure snapshot arithmetic over already-fetched holdings and latest prices.
///
/// Weights are `value / grand_total` while the grand total is positive and
/// zero otherwise. Lines are ordered by value (largest first), then symbol.
/// Fails with `Validation` when a value, the total or a weight does not fit
/// in a `Decimal`.
pub fn compute_snapshot(
    user_id: UserId,
    holdings: Vec<Holding>,
    latest: &HashMap<Symbol, PriceObservation>,
    as_of: DateTime<Utc>,
) -> Result<PortfolioSnapshot, CoreError> {
    let mut lines = holdings
        .into_iter()
        .map(|holding| -> Result<HoldingValuation, CoreError> {
            let observation = latest.get(&holding.symbol);
            if observation.is_none() {
                warn!(
                    "No price recorded for held symbol {}; valuing at zero",
                    holding.symbol
                );
            }
            let resolved_price = observation.map_or(Decimal::ZERO, |o| o.price);
            Ok(HoldingValuation {
                value: line_value(&holding.symbol, holding.quantity, resolved_price)?,
                symbol: holding.symbol,
                quantity: holding.quantity,
                resolved_price,
                priced_at: observation.map(|o| o.timestamp),
                weight: Decimal::ZERO, // filled below
                price_unavailable: observation.is_none(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let grand_total = checked_total(lines.iter().map(|l| l.value), "portfolio total")?;

    if grand_total > Decimal::ZERO {
        for line in &mut lines {
            line.weight = line
                .value
                .checked_div(grand_total)
                .ok_or_else(|| overflow(&format!("weight of {}", line.symbol)))?;
        }
    }

    lines.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.symbol.cmp(&b.symbol)));

    Ok(PortfolioSnapshot {
        user_id,
        as_of,
        holdings: lines,
        grand_total,
    })
}

/// Pure day-over-day arithmetic.
///
/// `recent` maps each symbol to its most recent observations, newest first.
/// With a single observation the prior price equals the current one; with
/// none both are zero. Fails with `Validation` on `Decimal` overflow.
pub fn compute_daily_change(
    holdings: &[Holding],
    recent: &BTreeMap<Symbol, Vec<PriceObservation>>,
) -> Result<DailyChange, CoreError> {
    let mut symbols = holdings
        .iter()
        .map(|holding| -> Result<SymbolChange, CoreError> {
            let observations = recent.get(&holding.symbol).map(Vec::as_slice).unwrap_or(&[]);
            let current_price = observations.first().map_or(Decimal::ZERO, |o| o.price);
            let prior_price = observations.get(1).map_or(current_price, |o| o.price);
            Ok(SymbolChange {
                symbol: holding.symbol.clone(),
                quantity: holding.quantity,
                current_price,
                prior_price,
                current_value: line_value(&holding.symbol, holding.quantity, current_price)?,
                prior_value: line_value(&holding.symbol, holding.quantity, prior_price)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let current_total = checked_total(symbols.iter().map(|s| s.current_value), "current total")?;
    let prior_total = checked_total(symbols.iter().map(|s| s.prior_value), "prior total")?;
    let diff = current_total
        .checked_sub(prior_total)
        .ok_or_else(|| overflow("daily difference"))?;

    // A zero or negative prior total counts as a full 100% gain whenever
    // there is any current value at all.
    let percent = if prior_total > Decimal::ZERO {
        diff.checked_div(prior_total)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| overflow("daily percent change"))?
    } else if current_total > Decimal::ZERO {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    Ok(DailyChange {
        current_total,
        prior_total,
        diff,
        percent,
        symbols,
    })
}

fn overflow(what: &str) -> CoreError {
    CoreError::Validation(format!("Valuation overflows: {what} does not fit in a decimal"))
}

fn line_value(symbol: &Symbol, quantity: Decimal, price: Decimal) -> Result<Decimal, CoreError> {
    quantity
        .checked_mul(price)
        .ok_or_else(|| overflow(&format!("value of {symbol}")))
}

fn checked_total(
    values: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal, CoreError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| overflow(what))
}
