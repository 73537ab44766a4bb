use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatusType, PaymentId};

/// What happened to the order (if anything) after a payment event was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransitionOutcome {
    /// `PENDING_PAYMENT -> FINALIZED`. Stock was decremented and consignment suppliers were credited.
    Finalized(Order),
    /// The payment was linked to the order, or the mirrored processor status changed. The lifecycle status did not.
    StatusMirrored(Order),
    /// `PENDING_PAYMENT -> CANCELLED`
    Cancelled(Order),
    /// `FINALIZED -> REFUNDED`. Stock was restored.
    Refunded(Order),
    /// The event was valid but there was nothing to do.
    NoOp(NoOpReason),
    /// The event could not be matched to any order. It is acknowledged and dropped.
    Dangling(String),
}

impl TransitionOutcome {
    /// The order as it stands after the transition, when there was one.
    pub fn order(&self) -> Option<&Order> {
        match self {
            TransitionOutcome::Finalized(o) |
            TransitionOutcome::StatusMirrored(o) |
            TransitionOutcome::Cancelled(o) |
            TransitionOutcome::Refunded(o) => Some(o),
            TransitionOutcome::NoOp(_) | TransitionOutcome::Dangling(_) => None,
        }
    }

    pub fn is_state_change(&self) -> bool {
        self.order().is_some()
    }
}

impl Display for TransitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionOutcome::Finalized(o) => write!(f, "order {} finalized", o.id),
            TransitionOutcome::StatusMirrored(o) => write!(
                f,
                "order {} linked to payment {} ({})",
                o.id,
                o.external_payment_id.as_ref().map(|p| p.as_str()).unwrap_or("-"),
                o.external_payment_status.as_deref().unwrap_or("-")
            ),
            TransitionOutcome::Cancelled(o) => write!(f, "order {} cancelled", o.id),
            TransitionOutcome::Refunded(o) => write!(f, "order {} refunded", o.id),
            TransitionOutcome::NoOp(reason) => write!(f, "no-op: {reason}"),
            TransitionOutcome::Dangling(reason) => write!(f, "dangling: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoOpReason {
    /// A redelivery of an event that has already been applied.
    AlreadyApplied { order_id: OrderId, status: OrderStatusType },
    /// The processor status on the order already matches the event.
    StatusUnchanged { order_id: OrderId, status: String },
    /// The event arrived after the order moved to a state it cannot leave for the one the event implies.
    Stale { order_id: OrderId, current: OrderStatusType, event: String },
    /// The payment status has no associated transition.
    Unhandled { payment_id: PaymentId, status: String },
}

impl Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoOpReason::AlreadyApplied { order_id, status } => write!(f, "order {order_id} is already {status}"),
            NoOpReason::StatusUnchanged { order_id, status } => {
                write!(f, "order {order_id} already mirrors processor status '{status}'")
            },
            NoOpReason::Stale { order_id, current, event } => {
                write!(f, "'{event}' event ignored for order {order_id} in status {current}")
            },
            NoOpReason::Unhandled { payment_id, status } => {
                write!(f, "payment {payment_id} has unhandled status '{status}'")
            },
        }
    }
}
