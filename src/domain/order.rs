use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

/// One product line of an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: RecordId,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

impl OrderLine {
    /// `None` when the line total does not fit in a `u64`.
    pub fn total_cents(&self) -> Option<u64> {
        self.unit_price_cents.checked_mul(u64::from(self.quantity))
    }
}

/// A customer order placed with a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(slot = "orders")]
pub struct Order {
    pub id: RecordId,
    pub customer_name: String,
    pub lines: Vec<OrderLine>,
    pub placed_at: DateTime<Utc>,
    #[record(default)]
    #[serde(default)]
    pub status: OrderStatus,
}

impl Order {
    /// Sum of the line totals, `None` on overflow.
    pub fn total_cents(&self) -> Option<u64> {
        self.lines
            .iter()
            .try_fold(0u64, |total, line| total.checked_add(line.total_cents()?))
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.status, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}
