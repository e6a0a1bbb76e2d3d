use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Order identifier. UUIDv7, so identifiers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account identifier, owned by the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product identifier, owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Order Value Objects
// ============================================================================

/// A (product, quantity) pair as the caller sent it. Quantity is not yet validated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

impl RequestedItem {
    pub fn new(product_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            product_id: ProductId::new(product_id),
            quantity,
        }
    }
}

/// One product line of an order with the catalog snapshot used for pricing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl LineItem {
    /// Line item as the ledger keeps it: identity and quantity only.
    pub fn unpriced(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            name: String::new(),
            description: String::new(),
            unit_price: Decimal::ZERO,
            quantity,
        }
    }

    /// Unit price times quantity, `None` on overflow.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub total_price: Decimal,
    pub items: Vec<LineItem>,
}

impl Order {
    /// Sum of unit price times quantity over the given line items,
    /// `None` if any step overflows.
    pub fn price(items: &[LineItem]) -> Option<Decimal> {
        items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.subtotal()?))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
