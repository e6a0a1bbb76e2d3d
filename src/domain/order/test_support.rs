// Shared fixtures for composer / aggregator tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::{
    Account, AccountLookup, CatalogLookup, InMemoryAccounts, InMemoryCatalog, LookupError, Product,
};
use crate::context::RequestContext;
use crate::metrics::Metrics;
use crate::store::{InMemoryOrderStore, OrderStore, StorageError};

use super::{AccountId, Order, OrderAggregator, OrderComposer, ProductId};

pub fn ctx() -> RequestContext {
    RequestContext::new(Duration::from_secs(1))
}

pub fn product(id: &str, name: &str, price: Decimal) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: format!("{} description", name),
        price,
    }
}

/// Account A1; catalog P1 = 10, P2 = 5, P4 = 2.5.
pub struct Fixture {
    pub accounts: Arc<InMemoryAccounts>,
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<InMemoryOrderStore>,
    pub metrics: Arc<Metrics>,
}

impl Fixture {
    pub fn new() -> Self {
        let accounts = InMemoryAccounts::with_accounts([Account {
            id: AccountId::new("A1"),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }]);
        let catalog = InMemoryCatalog::with_products([
            product("P1", "Widget", Decimal::from(10)),
            product("P2", "Gadget", Decimal::from(5)),
            product("P4", "Gizmo", Decimal::new(25, 1)),
        ]);

        Self {
            accounts: Arc::new(accounts),
            catalog: Arc::new(catalog),
            store: Arc::new(InMemoryOrderStore::new()),
            metrics: Arc::new(Metrics::new().expect("metrics")),
        }
    }

    pub fn composer(&self) -> OrderComposer {
        OrderComposer::new(
            self.accounts.clone(),
            self.catalog.clone(),
            self.store.clone(),
            self.metrics.clone(),
        )
    }

    pub fn aggregator(&self) -> OrderAggregator {
        OrderAggregator::new(self.store.clone(), self.catalog.clone(), self.metrics.clone())
    }

    /// Raw ledger contents for an account.
    pub async fn stored_orders(&self, account: &str) -> Vec<Order> {
        self.store
            .get_orders_for_account(&AccountId::new(account))
            .await
            .expect("in-memory store read")
    }
}

pub struct UnavailableCatalog;

#[async_trait]
impl CatalogLookup for UnavailableCatalog {
    async fn resolve(&self, _: &[ProductId]) -> Result<Vec<Product>, LookupError> {
        Err(LookupError::Transport("catalog connection refused".to_string()))
    }
}

/// Account directory that answers after a delay.
pub struct SlowAccounts(pub Duration);

#[async_trait]
impl AccountLookup for SlowAccounts {
    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>, LookupError> {
        tokio::time::sleep(self.0).await;
        Ok(Some(Account {
            id: account_id.clone(),
            name: String::new(),
            email: String::new(),
        }))
    }
}

/// Store that rejects every write and read.
pub struct FailingStore;

#[async_trait]
impl OrderStore for FailingStore {
    async fn put_order(&self, _: &Order) -> Result<(), StorageError> {
        Err(StorageError::Corrupt("disk full".to_string()))
    }

    async fn get_orders_for_account(&self, _: &AccountId) -> Result<Vec<Order>, StorageError> {
        Err(StorageError::Corrupt("disk full".to_string()))
    }
}
