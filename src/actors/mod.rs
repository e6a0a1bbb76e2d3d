// ============================================================================
// Actors Module
// ============================================================================
//
// The order actor is the message-based surface the gateway talks to.
// Business logic stays in the composer and aggregator; the actor only
// dispatches messages to them.
//
// ============================================================================

mod order_actor;

pub use order_actor::{GetOrdersForAccount, OrderActor, PostOrder};
