use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{Account, AccountLookup, CatalogLookup, LookupError, Product};
use crate::domain::order::{AccountId, ProductId};

// ============================================================================
// In-memory collaborators
// ============================================================================

/// Account directory held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    accounts: RwLock<HashMap<AccountId, Account>>,
    lookups: AtomicUsize,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let directory = Self::new();
        for account in accounts {
            directory.insert(account);
        }
        directory
    }

    pub fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        accounts.insert(account.id.clone(), account);
    }

    /// Number of `get` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountLookup for InMemoryAccounts {
    async fn get(&self, account_id: &AccountId) -> Result<Option<Account>, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        Ok(accounts.get(account_id).cloned())
    }
}

/// Product catalog held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
    lookups: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }

    /// Insert or replace a product.
    pub fn insert(&self, product: Product) {
        let mut products = self.products.write().unwrap_or_else(|e| e.into_inner());
        products.insert(product.id.clone(), product);
    }

    pub fn remove(&self, product_id: &ProductId) {
        let mut products = self.products.write().unwrap_or_else(|e| e.into_inner());
        products.remove(product_id);
    }

    /// Number of `resolve` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn resolve(&self, product_ids: &[ProductId]) -> Result<Vec<Product>, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let products = self.products.read().unwrap_or_else(|e| e.into_inner());
        Ok(product_ids
            .iter()
            .filter_map(|id| products.get(id).cloned())
            .collect())
    }
}
