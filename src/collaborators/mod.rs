// ============================================================================
// Collaborators - Account directory and product catalog
// ============================================================================
//
// Both are owned by other services. The order core only reads from them
// through the two traits below; concrete lookups are injected at
// construction time.
//
// - memory   - seedable in-process lookups (tests, demo)
// - postgres - lookups reading the accounts / products tables
// - cache    - TTL cache decorator around any CatalogLookup
//
// ============================================================================

mod cache;
mod memory;
mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::{AccountId, ProductId};

pub use cache::CachedCatalog;
pub use memory::{InMemoryAccounts, InMemoryCatalog};
pub use postgres::{PgAccountDirectory, PgCatalog};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

/// Failure talking to a collaborator. Not-found is not an error here.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for LookupError {
    fn from(err: sqlx::Error) -> Self {
        LookupError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Resolve an account, `Ok(None)` when it does not exist.
    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>, LookupError>;
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Resolve a batch of products. Unknown identifiers are simply absent
    /// from the result; an empty input yields an empty result.
    async fn resolve(&self, product_ids: &[ProductId]) -> Result<Vec<Product>, LookupError>;
}

#[async_trait]
impl<T: AccountLookup + ?Sized> AccountLookup for Arc<T> {
    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>, LookupError> {
        (**self).get(account_id).await
    }
}

#[async_trait]
impl<T: CatalogLookup + ?Sized> CatalogLookup for Arc<T> {
    async fn resolve(&self, product_ids: &[ProductId]) -> Result<Vec<Product>, LookupError> {
        (**self).resolve(product_ids).await
    }
}
