use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{OrderStore, StorageError};
use crate::domain::order::{AccountId, LineItem, Order, OrderId, ProductId};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// Tables:
// - orders         (id, created_at, account_id, total_price)
// - order_products (order_id, position, product_id, quantity)
//
// put_order writes the header and every line in ONE transaction. The
// transaction is rolled back on any error (explicitly, or by drop).
//
// ============================================================================

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL,
        account_id TEXT NOT NULL,
        total_price NUMERIC NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS orders_account_created_idx ON orders (account_id, created_at)",
    "CREATE TABLE IF NOT EXISTS order_products (
        order_id UUID NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        product_id TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        PRIMARY KEY (order_id, position)
    )",
];

/// One row of the orders ⟕ order_products join.
pub(crate) type OrderRow = (Uuid, DateTime<Utc>, String, Decimal, Option<String>, Option<i32>);

pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Order ledger schema ready");
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn put_order(&self, order: &Order) -> Result<(), StorageError> {
        let mut positions = Vec::with_capacity(order.items.len());
        let mut product_ids = Vec::with_capacity(order.items.len());
        let mut quantities = Vec::with_capacity(order.items.len());
        for (position, item) in order.items.iter().enumerate() {
            positions.push(position as i32);
            product_ids.push(item.product_id.0.clone());
            quantities.push(item.quantity);
        }

        let mut tx = self.pool.begin().await?;

        let header = sqlx::query(
            "INSERT INTO orders (id, created_at, account_id, total_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id.as_uuid())
        .bind(order.created_at)
        .bind(order.account_id.as_str())
        .bind(order.total_price)
        .execute(&mut *tx)
        .await;

        if let Err(err) = header {
            return Err(abort(tx, header_error(err, order.id)).await);
        }

        if !positions.is_empty() {
            let lines = sqlx::query(
                "INSERT INTO order_products (order_id, position, product_id, quantity)
                 SELECT $1::UUID, line.position, line.product_id, line.quantity
                 FROM UNNEST($2::INTEGER[], $3::TEXT[], $4::INTEGER[])
                      AS line (position, product_id, quantity)",
            )
            .bind(order.id.as_uuid())
            .bind(&positions)
            .bind(&product_ids)
            .bind(&quantities)
            .execute(&mut *tx)
            .await;

            if let Err(err) = lines {
                return Err(abort(tx, StorageError::Database(err)).await);
            }
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            account_id = %order.account_id,
            lines = order.items.len(),
            "✅ Persisted order and line items"
        );

        Ok(())
    }

    async fn get_orders_for_account(&self, account_id: &AccountId) -> Result<Vec<Order>, StorageError> {
        let mut rows = sqlx::query_as::<_, OrderRow>(
            "SELECT o.id, o.created_at, o.account_id, o.total_price, op.product_id, op.quantity
             FROM orders o
             LEFT JOIN order_products op ON o.id = op.order_id
             WHERE o.account_id = $1
             ORDER BY o.created_at, o.id, op.position",
        )
        .bind(account_id.as_str())
        .fetch(&self.pool);

        let mut collected = Vec::new();
        while let Some(row) = rows.try_next().await? {
            collected.push(row);
        }

        let orders = group_rows(collected)?;
        tracing::debug!(account_id = %account_id, orders = orders.len(), "Loaded orders for account");
        Ok(orders)
    }
}

/// Roll back and hand back the error that caused it. A failed rollback is
/// only logged; the connection discards the transaction either way.
async fn abort(tx: Transaction<'_, Postgres>, cause: StorageError) -> StorageError {
    if let Err(rollback) = tx.rollback().await {
        tracing::warn!(error = %rollback, cause = %cause, "Rollback failed");
    }
    cause
}

/// A unique violation on the header insert means the order id is taken.
fn header_error(err: sqlx::Error, order_id: OrderId) -> StorageError {
    let duplicate = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);

    if duplicate {
        StorageError::DuplicateOrder(order_id)
    } else {
        StorageError::Database(err)
    }
}

/// Fold ordered join rows into orders, one per consecutive run of order ids.
pub(crate) fn group_rows(rows: Vec<OrderRow>) -> Result<Vec<Order>, StorageError> {
    let mut orders: Vec<Order> = Vec::new();

    for (id, created_at, account_id, total_price, product_id, quantity) in rows {
        let starts_new = orders.last().map(|last| last.id.as_uuid() != id).unwrap_or(true);
        if starts_new {
            orders.push(Order {
                id: OrderId(id),
                account_id: AccountId::new(account_id),
                created_at,
                total_price,
                items: Vec::new(),
            });
        }

        let line = match (product_id, quantity) {
            (Some(product_id), Some(quantity)) => Some(LineItem::unpriced(ProductId::new(product_id), quantity)),
            (None, None) => None,
            _ => {
                return Err(StorageError::Corrupt(format!(
                    "order {} has a line item missing product or quantity",
                    id
                )))
            }
        };

        if let (Some(line), Some(order)) = (line, orders.last_mut()) {
            order.items.push(line);
        }
    }

    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};

    fn row(id: Uuid, created_at: DateTime<Utc>, product: Option<&str>, quantity: Option<i32>) -> OrderRow {
        (
            id,
            created_at,
            "A1".to_string(),
            Decimal::from(25),
            product.map(str::to_string),
            quantity,
        )
    }

    #[test]
    fn test_group_rows_builds_orders_in_row_order() {
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        let now = Utc::now();

        let orders = group_rows(vec![
            row(first, now, Some("P1"), Some(2)),
            row(first, now, Some("P2"), Some(1)),
            row(second, now, Some("P1"), Some(4)),
        ])
        .unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id.as_uuid(), first);
        assert_eq!(orders[0].account_id.as_str(), "A1");
        assert_eq!(orders[0].total_price, Decimal::from(25));
        assert_eq!(
            orders[0].items,
            vec![
                LineItem::unpriced(ProductId::new("P1"), 2),
                LineItem::unpriced(ProductId::new("P2"), 1),
            ]
        );
        assert_eq!(orders[1].id.as_uuid(), second);
        assert_eq!(orders[1].items, vec![LineItem::unpriced(ProductId::new("P1"), 4)]);
    }

    #[test]
    fn test_group_rows_keeps_order_without_lines() {
        let id = Uuid::now_v7();
        let orders = group_rows(vec![row(id, Utc::now(), None, None)]).unwrap();

        assert_eq!(orders.len(), 1);
        assert!(orders[0].items.is_empty());
    }

    #[test]
    fn test_group_rows_rejects_half_null_line() {
        let id = Uuid::now_v7();
        let result = group_rows(vec![row(id, Utc::now(), Some("P1"), None)]);
        assert!(matches!(result, Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_group_rows_empty() {
        assert!(group_rows(Vec::new()).unwrap().is_empty());
    }

    #[derive(Debug)]
    struct FakeDbError(ErrorKind);

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    #[test]
    fn test_unique_violation_maps_to_duplicate_order() {
        let id = OrderId::generate();
        let err = sqlx::Error::Database(Box::new(FakeDbError(ErrorKind::UniqueViolation)));

        assert!(matches!(header_error(err, id), StorageError::DuplicateOrder(dup) if dup == id));
    }

    #[test]
    fn test_other_header_failures_stay_database_errors() {
        let id = OrderId::generate();

        let check = sqlx::Error::Database(Box::new(FakeDbError(ErrorKind::Other)));
        assert!(matches!(header_error(check, id), StorageError::Database(_)));

        assert!(matches!(header_error(sqlx::Error::PoolTimedOut, id), StorageError::Database(_)));
    }

    #[test]
    fn test_schema_statements_are_idempotent() {
        for statement in SCHEMA {
            assert!(statement.contains("IF NOT EXISTS"));
        }
    }

    // put_order / get_orders_for_account against a live database are
    // exercised by the binary with DATABASE_URL pointing at Postgres.
}
