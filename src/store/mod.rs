// ============================================================================
// Order Store - append-only ledger of orders and their line items
// ============================================================================
//
// The store is the only component that writes order data. It keeps the
// order header plus (product_id, quantity) per line item; product details
// are NOT kept and come back empty on read.
//
// Implementations:
// - PostgresOrderStore - one transaction per order
// - InMemoryOrderStore - single write-locked insert per order
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::order::{AccountId, Order, OrderId};

pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    #[error("corrupt order data: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order header and all of its line items as one unit.
    ///
    /// Either everything becomes visible or nothing does. Writing an id that
    /// already exists fails with `StorageError::DuplicateOrder`.
    async fn put_order(&self, order: &Order) -> Result<(), StorageError>;

    /// Orders of one account, oldest first, with unpriced line items.
    async fn get_orders_for_account(&self, account_id: &AccountId) -> Result<Vec<Order>, StorageError>;
}
