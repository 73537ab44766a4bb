use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderStatusType},
    reconciler::confirmation::OrderConfirmation,
};

/// Published after an order has been finalized and the transaction has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFinalizedEvent {
    pub order: Order,
    pub confirmation: OrderConfirmation,
}

impl OrderFinalizedEvent {
    pub fn new(order: Order, confirmation: OrderConfirmation) -> Self {
        Self { order, confirmation }
    }
}

/// Published after an order was cancelled or refunded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}
