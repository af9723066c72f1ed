use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// One timestamped price fact for a symbol, as written by the external feed.
///
/// No sanity checks are applied to `price`: zero and negative values are
/// recorded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: Symbol,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(symbol: impl Into<Symbol>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }

    /// Drop the symbol, keeping only the chartable `(timestamp, price)` pair.
    #[must_use]
    pub fn point(&self) -> PricePoint {
        PricePoint {
            timestamp: self.timestamp,
            price: self.price,
        }
    }
}

/// A single `(timestamp, price)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Per-symbol observation history kept sorted by timestamp.
///
/// Observations sharing a timestamp stay in insertion order, so the last
/// element is always the most recently inserted of the newest timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationLog {
    entries: Vec<PricePoint>,
}

impl ObservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point at its sorted position (after any equal timestamps).
    ///
    /// Returns `false` and leaves the log untouched when the point repeats
    /// the most recently inserted entry at the same timestamp. An older
    /// price at that timestamp is appended again, so it becomes the one
    /// `latest` reports.
    pub fn insert(&mut self, point: PricePoint) -> bool {
        let end = self
            .entries
            .partition_point(|p| p.timestamp <= point.timestamp);

        if let Some(previous) = end.checked_sub(1).map(|i| &self.entries[i]) {
            if previous.timestamp == point.timestamp && previous.price == point.price {
                return false;
            }
        }
        self.entries.insert(end, point);
        true
    }

    /// The observation with the greatest timestamp (last inserted on ties).
    #[must_use]
    pub fn latest(&self) -> Option<&PricePoint> {
        self.entries.last()
    }

    /// Up to `n` most recent points, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &PricePoint> {
        self.entries.iter().rev().take(n)
    }

    /// Points with `from <= timestamp < to`, ascending.
    /// Uses binary search to find both boundaries.
    #[must_use]
    pub fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[PricePoint] {
        let start = self.entries.partition_point(|p| p.timestamp < from);
        let end = self.entries.partition_point(|p| p.timestamp < to);
        if start >= end {
            return &[];
        }
        &self.entries[start..end]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Chart-ready price history of one symbol, ordered by timestamp.
///
/// Holds no resampling or interpolation: gaps in the recorded data stay
/// gaps here. Iterating is cheap and can be repeated any number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: Symbol,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            points: Vec::new(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
