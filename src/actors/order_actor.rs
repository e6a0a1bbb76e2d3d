use actix::prelude::*;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::domain::order::{
    AccountId, Order, OrderAggregator, OrderComposer, OrderError, RequestedItem,
};

// ============================================================================
// Actor Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "Result<Order, OrderError>")]
pub struct PostOrder {
    pub ctx: RequestContext,
    pub account_id: AccountId,
    pub items: Vec<RequestedItem>,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<Order>, OrderError>")]
pub struct GetOrdersForAccount {
    pub ctx: RequestContext,
    pub account_id: AccountId,
}

// ============================================================================
// Order Actor - service surface for the gateway
// ============================================================================
//
// Holds no per-request state. Each message runs the composer or aggregator
// in its own future, so slow collaborators never block other requests
// queued on the actor.
//
// ============================================================================

pub struct OrderActor {
    composer: Arc<OrderComposer>,
    aggregator: Arc<OrderAggregator>,
}

impl OrderActor {
    pub fn new(composer: Arc<OrderComposer>, aggregator: Arc<OrderAggregator>) -> Self {
        Self { composer, aggregator }
    }
}

impl Actor for OrderActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("OrderActor started");
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<PostOrder> for OrderActor {
    type Result = ResponseFuture<Result<Order, OrderError>>;

    fn handle(&mut self, msg: PostOrder, _: &mut Self::Context) -> Self::Result {
        let composer = self.composer.clone();

        Box::pin(async move {
            tracing::debug!(
                correlation_id = %msg.ctx.correlation_id,
                account_id = %msg.account_id,
                item_count = msg.items.len(),
                "Received PostOrder"
            );

            composer.post_order(&msg.ctx, msg.account_id, msg.items).await
        })
    }
}

impl Handler<GetOrdersForAccount> for OrderActor {
    type Result = ResponseFuture<Result<Vec<Order>, OrderError>>;

    fn handle(&mut self, msg: GetOrdersForAccount, _: &mut Self::Context) -> Self::Result {
        let aggregator = self.aggregator.clone();

        Box::pin(async move {
            tracing::debug!(
                correlation_id = %msg.ctx.correlation_id,
                account_id = %msg.account_id,
                "Received GetOrdersForAccount"
            );

            aggregator.get_orders_for_account(&msg.ctx, &msg.account_id).await
        })
    }
}
