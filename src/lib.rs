// ============================================================================
// Order Composer
// ============================================================================
//
// Turns (account, [(product, quantity)]) requests into durable, priced
// orders, and reads them back enriched with current catalog details.
//
// Layout:
// - domain/        - order types, composer (write path), aggregator (read path)
// - collaborators/ - account directory / catalog traits and implementations
// - store/         - order ledger trait, Postgres and in-memory ledgers
// - actors/        - actix surface for the gateway
// - metrics/       - Prometheus metrics and /metrics, /health endpoints
// - config, context, utils
//
// ============================================================================

pub mod actors;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod domain;
pub mod metrics;
pub mod store;
pub mod utils;

pub use context::RequestContext;
pub use domain::order::{
    AccountId, LineItem, Order, OrderAggregator, OrderComposer, OrderError, OrderId, ProductId,
    RequestedItem,
};
