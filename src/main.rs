use actix::prelude::*;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_composer::actors::{GetOrdersForAccount, OrderActor, PostOrder};
use order_composer::collaborators::{
    Account, AccountLookup, CachedCatalog, CatalogLookup, InMemoryAccounts, InMemoryCatalog,
    PgAccountDirectory, PgCatalog, Product,
};
use order_composer::config::Config;
use order_composer::metrics::{self, Metrics};
use order_composer::store::PostgresOrderStore;
use order_composer::utils::{retry_with_backoff, RetryConfig};
use order_composer::{
    AccountId, OrderAggregator, OrderComposer, ProductId, RequestContext, RequestedItem,
};

const DEMO_ACCOUNT: &str = "demo-account";

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_composer=debug"))
        )
        .init();

    tracing::info!("🚀 Starting order composer");

    let config = Config::from_env()?;

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    actix::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 2. Order ledger ===
    let pool = connect(&config, &config.database_url, "order database").await?;
    let store = Arc::new(PostgresOrderStore::new(pool));
    store.ensure_schema().await?;

    // === 3. Collaborators ===
    let accounts: Arc<dyn AccountLookup> = match &config.account_database_url {
        Some(url) => Arc::new(PgAccountDirectory::new(connect(&config, url, "account database").await?)),
        None => {
            tracing::warn!("ACCOUNT_DATABASE_URL not set, using in-memory demo accounts");
            Arc::new(demo_accounts())
        }
    };

    let catalog: Arc<dyn CatalogLookup> = match &config.catalog_database_url {
        Some(url) => Arc::new(PgCatalog::new(connect(&config, url, "catalog database").await?)),
        None => {
            tracing::warn!("CATALOG_DATABASE_URL not set, using in-memory demo catalog");
            Arc::new(demo_catalog())
        }
    };

    let catalog: Arc<dyn CatalogLookup> = match config.catalog_cache_ttl {
        Some(ttl) => {
            tracing::info!(ttl_secs = ttl.as_secs(), "Catalog cache enabled");
            Arc::new(CachedCatalog::new(catalog, ttl).with_metrics(metrics.clone()))
        }
        None => catalog,
    };

    // === 4. Order actor ===
    let composer = Arc::new(OrderComposer::new(accounts, catalog.clone(), store.clone(), metrics.clone()));
    let aggregator = Arc::new(OrderAggregator::new(store, catalog, metrics.clone()));
    let order_actor = OrderActor::new(composer, aggregator).start();

    // === 5. Demonstrate the write and read paths ===
    run_demo(&order_actor, &config).await;

    tracing::info!("⏳ Serving metrics on port {}, press Ctrl-C to stop", config.metrics_port);
    tokio::signal::ctrl_c().await?;
    tracing::info!("👋 Shutting down");

    Ok(())
}

async fn connect(config: &Config, url: &str, name: &str) -> anyhow::Result<PgPool> {
    tracing::info!("Connecting to {}...", name);
    let retry = RetryConfig::fixed(config.db_connect_attempts, config.db_connect_delay);

    let pool = retry_with_backoff(&retry, name, |_attempt| {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(url)
    })
    .await?;

    Ok(pool)
}

async fn run_demo(order_actor: &Addr<OrderActor>, config: &Config) {
    let account_id = AccountId::new(DEMO_ACCOUNT);

    let posted = order_actor
        .send(PostOrder {
            ctx: RequestContext::new(config.request_timeout),
            account_id: account_id.clone(),
            items: vec![
                RequestedItem::new("demo-widget", 2),
                RequestedItem::new("demo-gadget", 1),
                RequestedItem::new("discontinued", 4),
            ],
        })
        .await;

    match posted {
        Ok(Ok(order)) => tracing::info!(
            order_id = %order.id,
            total_price = %order.total_price,
            line_items = order.items.len(),
            "✅ Demo order created"
        ),
        Ok(Err(e)) => tracing::warn!(error = %e, "Demo order rejected"),
        Err(e) => tracing::error!(error = %e, "Order actor unavailable"),
    }

    let orders = order_actor
        .send(GetOrdersForAccount {
            ctx: RequestContext::new(config.request_timeout),
            account_id,
        })
        .await;

    match orders {
        Ok(Ok(orders)) => {
            for order in &orders {
                tracing::info!(
                    order_id = %order.id,
                    created_at = %order.created_at,
                    total_price = %order.total_price,
                    line_items = order.items.len(),
                    "📦 Order on record"
                );
            }
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "Could not load demo orders"),
        Err(e) => tracing::error!(error = %e, "Order actor unavailable"),
    }
}

fn demo_accounts() -> InMemoryAccounts {
    InMemoryAccounts::with_accounts([Account {
        id: AccountId::new(DEMO_ACCOUNT),
        name: "Demo Customer".to_string(),
        email: "demo@example.com".to_string(),
    }])
}

fn demo_catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_products([
        Product {
            id: ProductId::new("demo-widget"),
            name: "Widget".to_string(),
            description: "A general purpose widget".to_string(),
            price: Decimal::new(1000, 2),
        },
        Product {
            id: ProductId::new("demo-gadget"),
            name: "Gadget".to_string(),
            description: "A gadget to go with the widget".to_string(),
            price: Decimal::new(500, 2),
        },
    ])
}
