use serde::{Deserialize, Serialize};

use crate::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Listed,
    Archived,
}

/// An item sold in a store profile's shop. Prices are in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(slot = "products")]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub price_cents: u64,
    #[record(default)]
    #[serde(default)]
    pub stock: u32,
    #[record(default)]
    #[serde(default)]
    pub status: ProductStatus,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
