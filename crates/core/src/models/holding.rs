use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::UserId;
use super::symbol::Symbol;

/// A user's recorded quantity of one symbol.
///
/// At most one `Holding` exists per `(user_id, symbol)` pair and its
/// `quantity` is always strictly positive: a decrement that reaches zero
/// deletes the record instead of keeping an explicit zero row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Unique identifier, assigned on first acquisition
    pub id: Uuid,

    /// Owner of the holding
    pub user_id: UserId,

    /// Held security
    pub symbol: Symbol,

    /// Unit count (always > 0 while the record exists)
    pub quantity: Decimal,

    /// First-acquisition time
    pub created_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(
        user_id: UserId,
        symbol: Symbol,
        quantity: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            quantity,
            created_at,
        }
    }
}
