use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{CatalogLookup, LookupError, Product};
use crate::domain::order::ProductId;
use crate::metrics::Metrics;

// ============================================================================
// Catalog Cache - TTL decorator around any CatalogLookup
// ============================================================================
//
// Hits inside the TTL are served from memory, misses are fetched from the
// inner lookup in ONE batch. Nothing is cached when the inner call fails.
// Products the catalog does not know are never cached. Expired entries are
// pruned whenever misses are written back.
//
// ============================================================================

pub struct CachedCatalog<C> {
    inner: C,
    ttl: Duration,
    entries: RwLock<HashMap<ProductId, CacheEntry>>,
    metrics: Option<Arc<Metrics>>,
}

struct CacheEntry {
    product: Product,
    fetched_at: Instant,
}

impl<C: CatalogLookup> CachedCatalog<C> {
    pub fn new(inner: C, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Drop every cached product.
    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl<C: CatalogLookup> CatalogLookup for CachedCatalog<C> {
    async fn resolve(&self, product_ids: &[ProductId]) -> Result<Vec<Product>, LookupError> {
        let mut found = Vec::with_capacity(product_ids.len());
        let mut misses = Vec::new();

        {
            let entries = self.entries.read().await;
            for id in product_ids {
                match entries.get(id) {
                    Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                        found.push(entry.product.clone());
                    }
                    _ => misses.push(id.clone()),
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_catalog_cache(found.len(), misses.len());
        }

        if misses.is_empty() {
            tracing::debug!(hits = found.len(), "Catalog lookup served from cache");
            return Ok(found);
        }

        let fetched = self.inner.resolve(&misses).await?;

        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        for product in &fetched {
            entries.insert(
                product.id.clone(),
                CacheEntry {
                    product: product.clone(),
                    fetched_at: now,
                },
            );
        }
        drop(entries);

        tracing::debug!(
            hits = found.len(),
            misses = misses.len(),
            fetched = fetched.len(),
            "Catalog lookup partially served from cache"
        );

        found.extend(fetched);
        Ok(found)
    }
}
