// Private module declaration
mod server;

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order creation outcomes and latency
// - Order reads
// - Account / catalog collaborator calls
// - Catalog cache effectiveness
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Write path
    pub orders_posted: IntCounterVec,
    pub order_post_duration: Histogram,

    // Read path
    pub order_reads: IntCounterVec,

    // Collaborators
    pub collaborator_calls: IntCounterVec,
    pub catalog_cache_hits: IntCounter,
    pub catalog_cache_misses: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_posted = IntCounterVec::new(
            Opts::new("orders_posted_total", "Order creation requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(orders_posted.clone()))?;

        let order_post_duration = Histogram::with_opts(
            HistogramOpts::new("order_post_duration_seconds", "End-to-end order creation duration")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 3.0, 5.0]),
        )?;
        registry.register(Box::new(order_post_duration.clone()))?;

        let order_reads = IntCounterVec::new(
            Opts::new("order_reads_total", "Order read requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(order_reads.clone()))?;

        let collaborator_calls = IntCounterVec::new(
            Opts::new("collaborator_calls_total", "Calls to account directory and catalog"),
            &["collaborator", "outcome"],
        )?;
        registry.register(Box::new(collaborator_calls.clone()))?;

        let catalog_cache_hits = IntCounter::new(
            "catalog_cache_hits_total",
            "Products served from the catalog cache",
        )?;
        registry.register(Box::new(catalog_cache_hits.clone()))?;

        let catalog_cache_misses = IntCounter::new(
            "catalog_cache_misses_total",
            "Products forwarded to the catalog",
        )?;
        registry.register(Box::new(catalog_cache_misses.clone()))?;

        Ok(Self {
            registry,
            orders_posted,
            order_post_duration,
            order_reads,
            collaborator_calls,
            catalog_cache_hits,
            catalog_cache_misses,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// `outcome` is "ok" or an `OrderError::kind()` label.
    pub fn record_order_posted(&self, outcome: &str, duration_secs: f64) {
        self.orders_posted.with_label_values(&[outcome]).inc();
        self.order_post_duration.observe(duration_secs);
    }

    pub fn record_order_read(&self, outcome: &str) {
        self.order_reads.with_label_values(&[outcome]).inc();
    }

    pub fn record_collaborator_call(&self, collaborator: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.collaborator_calls.with_label_values(&[collaborator, outcome]).inc();
    }

    pub fn record_catalog_cache(&self, hits: usize, misses: usize) {
        self.catalog_cache_hits.inc_by(hits as u64);
        self.catalog_cache_misses.inc_by(misses as u64);
    }
}
