use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{Account, AccountLookup, CatalogLookup, LookupError, Product};
use crate::domain::order::{AccountId, ProductId};

// ============================================================================
// Postgres-backed collaborators
// ============================================================================
//
// Read-only views over the account service's `accounts` table and the
// catalog's `products` table. The order core never writes to either.
//
// ============================================================================

type ProductRow = (String, String, String, Decimal);

pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountLookup for PgAccountDirectory {
    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>, LookupError> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, name, email FROM accounts WHERE id = $1")
                .bind(account_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name, email)| Account {
            id: AccountId::new(id),
            name,
            email,
        }))
    }
}

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    async fn resolve(&self, product_ids: &[ProductId]) -> Result<Vec<Product>, LookupError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = product_ids.iter().map(|id| id.0.clone()).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, name, description, price FROM products WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            requested = ids.len(),
            found = rows.len(),
            "Resolved products from catalog table"
        );

        Ok(rows.into_iter().map(product_from_row).collect())
    }
}

fn product_from_row((id, name, description, price): ProductRow) -> Product {
    Product {
        id: ProductId::new(id),
        name,
        description,
        price,
    }
}
