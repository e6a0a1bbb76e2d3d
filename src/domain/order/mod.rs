// ============================================================================
// Order Domain - composition and aggregation of orders
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderId, Order, LineItem, RequestedItem)
// - Errors (OrderError enum)
// - Composer (write path: validate, price, persist)
// - Aggregator (read path: load, enrich)
//
// Collaborators and storage are reached only through their traits.
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod composer;
pub mod aggregator;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use composer::*;
pub use aggregator::*;
