use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use chrono::Utc;

use crate::collaborators::{AccountLookup, CatalogLookup, Product};
use crate::context::RequestContext;
use crate::metrics::Metrics;
use crate::store::OrderStore;

use super::errors::OrderError;
use super::value_objects::{AccountId, LineItem, Order, OrderId, ProductId, RequestedItem};

// ============================================================================
// Order Composer - write path
// ============================================================================
//
// Orchestrates: Validate → Account → Catalog → Price → Store
//
// - Account and catalog are called one after the other, each under the
//   request timeout. Any failure aborts before anything is written.
// - Requested products the catalog does not return are dropped. A request
//   where nothing matches is rejected rather than stored as an empty order.
// - Exactly one OrderStore write per successful call. No retries.
//
// ============================================================================

pub struct OrderComposer {
    accounts: Arc<dyn AccountLookup>,
    catalog: Arc<dyn CatalogLookup>,
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
}

impl OrderComposer {
    pub fn new(
        accounts: Arc<dyn AccountLookup>,
        catalog: Arc<dyn CatalogLookup>,
        store: Arc<dyn OrderStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            accounts,
            catalog,
            store,
            metrics,
        }
    }

    /// Validate, price and persist a new order for `account_id`.
    pub async fn post_order(
        &self,
        ctx: &RequestContext,
        account_id: AccountId,
        items: Vec<RequestedItem>,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.compose(ctx, account_id, items).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        self.metrics.record_order_posted(outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn compose(
        &self,
        ctx: &RequestContext,
        account_id: AccountId,
        items: Vec<RequestedItem>,
    ) -> Result<Order, OrderError> {
        if account_id.as_str().trim().is_empty() {
            return Err(OrderError::InvalidInput("account id is empty".to_string()));
        }
        let wanted = normalize_items(items)?;

        self.verify_account(ctx, &account_id).await?;

        let product_ids: Vec<ProductId> = wanted.iter().map(|(id, _)| id.clone()).collect();
        let products = ctx.bounded(self.catalog.resolve(&product_ids)).await;
        self.metrics.record_collaborator_call("catalog", products.is_ok());
        let products = products.map_err(|e| {
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                error = %e,
                "Catalog lookup failed, order not created"
            );
            OrderError::CatalogUnavailable(e)
        })?;

        let items = price_items(&wanted, &products);
        if items.is_empty() {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                account_id = %account_id,
                requested = wanted.len(),
                "None of the requested products exist in the catalog"
            );
            return Err(OrderError::InvalidInput(
                "none of the requested products exist in the catalog".to_string(),
            ));
        }

        let total_price = Order::price(&items).ok_or_else(|| {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                account_id = %account_id,
                "Order rejected: total price overflows"
            );
            OrderError::InvalidInput("order total is too large".to_string())
        })?;

        let order = Order {
            id: OrderId::generate(),
            account_id,
            created_at: Utc::now(),
            total_price,
            items,
        };

        if let Err(e) = self.store.put_order(&order).await {
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                order_id = %order.id,
                error = %e,
                "Failed to persist order"
            );
            return Err(e.into());
        }

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            order_id = %order.id,
            account_id = %order.account_id,
            line_items = order.items.len(),
            total_price = %order.total_price,
            "✅ Order created"
        );

        Ok(order)
    }

    async fn verify_account(&self, ctx: &RequestContext, account_id: &AccountId) -> Result<(), OrderError> {
        let account = ctx.bounded(self.accounts.get(account_id)).await;
        self.metrics.record_collaborator_call("account", account.is_ok());

        match account {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                tracing::warn!(
                    correlation_id = %ctx.correlation_id,
                    account_id = %account_id,
                    "Order rejected: account not found"
                );
                Err(OrderError::AccountNotFound(account_id.clone()))
            }
            Err(e) => {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    account_id = %account_id,
                    error = %e,
                    "Account lookup failed, order not created"
                );
                Err(OrderError::AccountUnavailable(e))
            }
        }
    }
}

/// Drop invalid items and merge repeated products, keeping first-seen order.
fn normalize_items(items: Vec<RequestedItem>) -> Result<Vec<(ProductId, i32)>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::InvalidInput("order has no items".to_string()));
    }

    let mut wanted: Vec<(ProductId, i32)> = Vec::with_capacity(items.len());
    let mut index: HashMap<ProductId, usize> = HashMap::new();

    for item in items {
        if item.quantity <= 0 || item.product_id.as_str().trim().is_empty() {
            tracing::debug!(
                product_id = %item.product_id,
                quantity = item.quantity,
                "Dropping invalid order item"
            );
            continue;
        }

        match index.get(&item.product_id) {
            Some(&at) => {
                let merged = wanted[at].1.checked_add(item.quantity).ok_or_else(|| {
                    OrderError::InvalidInput(format!("quantity overflow for product {}", item.product_id))
                })?;
                wanted[at].1 = merged;
            }
            None => {
                index.insert(item.product_id.clone(), wanted.len());
                wanted.push((item.product_id, item.quantity));
            }
        }
    }

    if wanted.is_empty() {
        return Err(OrderError::InvalidInput(
            "no order item has a positive quantity".to_string(),
        ));
    }

    Ok(wanted)
}

/// Snapshot catalog details onto each wanted item. Unmatched items are dropped.
fn price_items(wanted: &[(ProductId, i32)], products: &[Product]) -> Vec<LineItem> {
    let by_id: HashMap<&ProductId, &Product> = products.iter().map(|p| (&p.id, p)).collect();

    wanted
        .iter()
        .filter_map(|(product_id, quantity)| match by_id.get(product_id) {
            Some(product) => Some(LineItem {
                product_id: product_id.clone(),
                name: product.name.clone(),
                description: product.description.clone(),
                unit_price: product.price,
                quantity: *quantity,
            }),
            None => {
                tracing::debug!(product_id = %product_id, "Dropping item missing from catalog");
                None
            }
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::LookupError;
    use crate::domain::order::test_support::*;
    use crate::store::StorageError;
    use rust_decimal::Decimal;
    use std::time::Duration;

    #[tokio::test]
    async fn test_post_order_prices_and_persists() {
        let fx = Fixture::new();

        let order = fx
            .composer()
            .post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 2), RequestedItem::new("P2", 1)])
            .await
            .unwrap();

        assert_eq!(order.total_price, Decimal::from(25));
        assert_eq!(order.account_id, AccountId::new("A1"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].name, "Widget");
        assert_eq!(order.items[0].unit_price, Decimal::from(10));
        assert_eq!(order.items[1].product_id, ProductId::new("P2"));
        assert_eq!(fx.store.len(), 1);
        assert!(fx.store.contains(&order.id));
    }

    #[tokio::test]
    async fn test_total_matches_persisted_line_items() {
        let fx = Fixture::new();
        let requests = vec![
            vec![RequestedItem::new("P1", 3)],
            vec![RequestedItem::new("P2", 7), RequestedItem::new("P4", 4)],
            vec![RequestedItem::new("P1", 1), RequestedItem::new("P2", 2), RequestedItem::new("P9", 5)],
        ];

        for items in requests {
            let order = fx.composer().post_order(&ctx(), AccountId::new("A1"), items).await.unwrap();
            let expected: Decimal = order
                .items
                .iter()
                .map(|i| i.unit_price * Decimal::from(i.quantity))
                .sum();
            assert_eq!(order.total_price, expected);
            assert!(order.items.iter().all(|i| i.quantity > 0));
        }
    }

    #[tokio::test]
    async fn test_unmatched_products_are_dropped() {
        let fx = Fixture::new();

        let order = fx
            .composer()
            .post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 1), RequestedItem::new("P404", 9)])
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, ProductId::new("P1"));
        assert_eq!(order.total_price, Decimal::from(10));

        let stored = fx.stored_orders("A1").await;
        assert!(stored[0].items.iter().all(|i| i.product_id.as_str() != "P404"));
    }

    #[tokio::test]
    async fn test_no_matching_product_is_rejected_without_write() {
        let fx = Fixture::new();

        let result = fx
            .composer()
            .post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P3", 1)])
            .await;

        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_account_fails_without_write() {
        let fx = Fixture::new();

        let result = fx
            .composer()
            .post_order(&ctx(), AccountId::new("missing"), vec![RequestedItem::new("P1", 1)])
            .await;

        match result {
            Err(OrderError::AccountNotFound(id)) => assert_eq!(id.as_str(), "missing"),
            other => panic!("expected AccountNotFound, got {:?}", other),
        }
        assert!(fx.store.is_empty());
        assert_eq!(fx.catalog.lookups(), 0);
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected_before_any_lookup() {
        let fx = Fixture::new();

        let result = fx.composer().post_order(&ctx(), AccountId::new("A1"), vec![]).await;

        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
        assert_eq!(fx.accounts.lookups(), 0);
        assert_eq!(fx.catalog.lookups(), 0);
    }

    #[tokio::test]
    async fn test_blank_account_id_is_rejected() {
        let fx = Fixture::new();
        let result = fx
            .composer()
            .post_order(&ctx(), AccountId::new("  "), vec![RequestedItem::new("P1", 1)])
            .await;
        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
        assert_eq!(fx.accounts.lookups(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_quantities_are_dropped() {
        let fx = Fixture::new();

        let order = fx
            .composer()
            .post_order(
                &ctx(),
                AccountId::new("A1"),
                vec![RequestedItem::new("P1", 0), RequestedItem::new("P2", -3), RequestedItem::new("P4", 2)],
            )
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, ProductId::new("P4"));
        assert_eq!(order.total_price, Decimal::new(50, 1));
    }

    #[tokio::test]
    async fn test_only_non_positive_quantities_is_invalid() {
        let fx = Fixture::new();

        let result = fx
            .composer()
            .post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 0), RequestedItem::new("P2", -1)])
            .await;

        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
        assert_eq!(fx.accounts.lookups(), 0);
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_products_are_merged() {
        let fx = Fixture::new();

        let order = fx
            .composer()
            .post_order(
                &ctx(),
                AccountId::new("A1"),
                vec![RequestedItem::new("P2", 1), RequestedItem::new("P1", 1), RequestedItem::new("P2", 2)],
            )
            .await
            .unwrap();

        let lines: Vec<(&str, i32)> = order.items.iter().map(|i| (i.product_id.as_str(), i.quantity)).collect();
        assert_eq!(lines, vec![("P2", 3), ("P1", 1)]);
        assert_eq!(order.total_price, Decimal::from(25));
    }

    #[tokio::test]
    async fn test_total_overflow_is_rejected_without_write() {
        let fx = Fixture::new();
        fx.catalog.insert(product("BIG", "Huge", Decimal::MAX));

        let result = fx
            .composer()
            .post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("BIG", 2)])
            .await;

        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_orders_do_not_interfere() {
        let fx = Fixture::new();
        let composer = Arc::new(fx.composer());

        let handles: Vec<_> = (1..=16)
            .map(|quantity| {
                let composer = composer.clone();
                tokio::spawn(async move {
                    composer
                        .post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", quantity)])
                        .await
                })
            })
            .collect();

        let mut placed = Vec::new();
        for handle in futures_util::future::join_all(handles).await {
            placed.push(handle.unwrap().unwrap());
        }

        assert_eq!(fx.store.len(), 16);
        let stored = fx.stored_orders("A1").await;
        for order in &placed {
            let read = stored.iter().find(|o| o.id == order.id).unwrap();
            assert_eq!(read.total_price, Decimal::from(10 * order.items[0].quantity));
            assert_eq!(read.items.len(), 1);
            assert_eq!(read.items[0].quantity, order.items[0].quantity);
        }
    }

    #[tokio::test]
    async fn test_catalog_failure_aborts_without_write() {
        let fx = Fixture::new();
        let composer = OrderComposer::new(fx.accounts.clone(), Arc::new(UnavailableCatalog), fx.store.clone(), fx.metrics.clone());

        let result = composer.post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::CatalogUnavailable(LookupError::Transport(_)))));
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_account_timeout_aborts_without_write() {
        let fx = Fixture::new();
        let composer = OrderComposer::new(
            Arc::new(SlowAccounts(Duration::from_secs(5))),
            fx.catalog.clone(),
            fx.store.clone(),
            fx.metrics.clone(),
        );
        let ctx = RequestContext::new(Duration::from_millis(20));

        let result = composer.post_order(&ctx, AccountId::new("A1"), vec![RequestedItem::new("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::AccountUnavailable(LookupError::Timeout(_)))));
        assert_eq!(fx.catalog.lookups(), 0);
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_and_leaves_nothing() {
        let fx = Fixture::new();
        let store = Arc::new(FailingStore);
        let composer = OrderComposer::new(fx.accounts.clone(), fx.catalog.clone(), store, fx.metrics.clone());

        let result = composer.post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::StorageFailure(StorageError::Corrupt(_)))));
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_each_order_gets_a_new_id() {
        let fx = Fixture::new();
        let composer = fx.composer();

        let first = composer.post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 1)]).await.unwrap();
        let second = composer.post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 1)]).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.created_at <= second.created_at);
        assert_eq!(fx.store.len(), 2);
    }

    #[tokio::test]
    async fn test_outcomes_are_recorded() {
        let fx = Fixture::new();
        let composer = fx.composer();

        composer.post_order(&ctx(), AccountId::new("A1"), vec![RequestedItem::new("P1", 1)]).await.unwrap();
        let _ = composer.post_order(&ctx(), AccountId::new("missing"), vec![RequestedItem::new("P1", 1)]).await;

        assert_eq!(fx.metrics.orders_posted.with_label_values(&["ok"]).get(), 1);
        assert_eq!(fx.metrics.orders_posted.with_label_values(&["account_not_found"]).get(), 1);
        assert_eq!(fx.metrics.collaborator_calls.with_label_values(&["account", "ok"]).get(), 2);
        assert_eq!(fx.metrics.collaborator_calls.with_label_values(&["catalog", "ok"]).get(), 1);
    }

    #[test]
    fn test_normalize_items_rejects_overflow() {
        let result = normalize_items(vec![RequestedItem::new("P1", i32::MAX), RequestedItem::new("P1", 1)]);
        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_items_drops_blank_product_ids() {
        let wanted = normalize_items(vec![RequestedItem::new("", 2), RequestedItem::new("P1", 2)]).unwrap();
        assert_eq!(wanted, vec![(ProductId::new("P1"), 2)]);
    }
}
