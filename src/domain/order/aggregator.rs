use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::collaborators::{CatalogLookup, Product};
use crate::context::RequestContext;
use crate::metrics::Metrics;
use crate::store::OrderStore;

use super::errors::OrderError;
use super::value_objects::{AccountId, Order, ProductId};

// ============================================================================
// Order Aggregator - read path
// ============================================================================
//
// Orchestrates: Store (grouped read) → ONE batch catalog lookup → merge
//
// The ledger keeps only (product_id, quantity) per line, so product details
// are always fetched fresh. A product missing from a successful lookup
// leaves its line items with empty details; a failed lookup fails the read.
//
// ============================================================================

pub struct OrderAggregator {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogLookup>,
    metrics: Arc<Metrics>,
}

impl OrderAggregator {
    pub fn new(store: Arc<dyn OrderStore>, catalog: Arc<dyn CatalogLookup>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            catalog,
            metrics,
        }
    }

    /// Orders of `account_id`, oldest first, line items enriched from the catalog.
    pub async fn get_orders_for_account(
        &self,
        ctx: &RequestContext,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, OrderError> {
        let result = self.load(ctx, account_id).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        self.metrics.record_order_read(outcome);

        result
    }

    async fn load(&self, ctx: &RequestContext, account_id: &AccountId) -> Result<Vec<Order>, OrderError> {
        let mut orders = self.store.get_orders_for_account(account_id).await.map_err(|e| {
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                account_id = %account_id,
                error = %e,
                "Failed to load orders"
            );
            OrderError::StorageFailure(e)
        })?;

        let product_ids = distinct_products(&orders);
        if product_ids.is_empty() {
            return Ok(orders);
        }

        let products = ctx.bounded(self.catalog.resolve(&product_ids)).await;
        self.metrics.record_collaborator_call("catalog", products.is_ok());
        let products = products.map_err(|e| {
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                account_id = %account_id,
                error = %e,
                "Catalog lookup failed while enriching orders"
            );
            OrderError::CatalogUnavailable(e)
        })?;

        let unmatched = enrich(&mut orders, &products);
        if unmatched > 0 {
            tracing::debug!(
                correlation_id = %ctx.correlation_id,
                account_id = %account_id,
                unmatched,
                "Some ordered products are no longer in the catalog"
            );
        }

        tracing::debug!(
            correlation_id = %ctx.correlation_id,
            account_id = %account_id,
            orders = orders.len(),
            products = product_ids.len(),
            "Loaded and enriched orders"
        );

        Ok(orders)
    }
}

/// Every product referenced by the orders, once, in first-seen order.
fn distinct_products(orders: &[Order]) -> Vec<ProductId> {
    let mut seen = HashSet::new();
    orders
        .iter()
        .flat_map(|order| order.items.iter())
        .filter(|item| seen.insert(&item.product_id))
        .map(|item| item.product_id.clone())
        .collect()
}

/// Merge catalog details into line items. Returns the number of line items
/// left without a match.
fn enrich(orders: &mut [Order], products: &[Product]) -> usize {
    let by_id: HashMap<&ProductId, &Product> = products.iter().map(|p| (&p.id, p)).collect();
    let mut unmatched = 0;

    for item in orders.iter_mut().flat_map(|order| order.items.iter_mut()) {
        match by_id.get(&item.product_id) {
            Some(product) => {
                item.name = product.name.clone();
                item.description = product.description.clone();
                item.unit_price = product.price;
            }
            None => unmatched += 1,
        }
    }

    unmatched
}

// ============================================================================
// Unit Tests
// ============================================================================
