use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{OrderStore, StorageError};
use crate::domain::order::{AccountId, LineItem, Order, OrderId, ProductId};

/// What the ledger keeps for one order. Product details are not stored.
#[derive(Debug, Clone)]
struct StoredOrder {
    id: OrderId,
    account_id: AccountId,
    created_at: DateTime<Utc>,
    total_price: Decimal,
    lines: Vec<(ProductId, i32)>,
}

impl StoredOrder {
    fn from_order(order: &Order) -> Self {
        Self {
            id: order.id,
            account_id: order.account_id.clone(),
            created_at: order.created_at,
            total_price: order.total_price,
            lines: order
                .items
                .iter()
                .map(|item| (item.product_id.clone(), item.quantity))
                .collect(),
        }
    }

    fn to_order(&self) -> Order {
        Order {
            id: self.id,
            account_id: self.account_id.clone(),
            created_at: self.created_at,
            total_price: self.total_price,
            items: self
                .lines
                .iter()
                .map(|(product_id, quantity)| LineItem::unpriced(product_id.clone(), *quantity))
                .collect(),
        }
    }
}

/// In-memory order ledger.
///
/// Suitable for tests and the demo binary.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, StoredOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders in the ledger.
    pub fn len(&self) -> usize {
        self.orders.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.orders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn put_order(&self, order: &Order) -> Result<(), StorageError> {
        if order.items.iter().any(|item| item.quantity <= 0) {
            return Err(StorageError::Corrupt(format!(
                "order {} has a line item with non-positive quantity",
                order.id
            )));
        }

        let mut orders = self.orders.write().unwrap_or_else(|e| e.into_inner());
        if orders.contains_key(&order.id) {
            return Err(StorageError::DuplicateOrder(order.id));
        }
        orders.insert(order.id, StoredOrder::from_order(order));

        tracing::debug!(order_id = %order.id, lines = order.items.len(), "Stored order in memory");
        Ok(())
    }

    async fn get_orders_for_account(&self, account_id: &AccountId) -> Result<Vec<Order>, StorageError> {
        let orders = self.orders.read().unwrap_or_else(|e| e.into_inner());

        let mut matching: Vec<&StoredOrder> = orders
            .values()
            .filter(|stored| &stored.account_id == account_id)
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(matching.into_iter().map(StoredOrder::to_order).collect())
    }
}
