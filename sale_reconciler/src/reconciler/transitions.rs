//! The order state machine, as pure functions.
//!
//! Each `decide_*` function looks at the order linked to the payment (`linked`), or failing that the order named by
//! the payment's external reference (`referenced`), and returns the [`Decision`] the backend must carry out. The
//! functions do no I/O, so the backend calls them inside its transaction, after the lookups and before any writes.
//!
//! The rules are:
//! * `PENDING_PAYMENT -> FINALIZED` on approval, `PENDING_PAYMENT -> CANCELLED` on rejection and
//!   `FINALIZED -> REFUNDED` on refund are the only lifecycle edges.
//! * `CANCELLED` and `REFUNDED` are sticky. Nothing moves an order out of them.
//! * Re-applying an event to an order that already reflects it is a no-op, which makes redelivery harmless.
use log::warn;

use crate::{
    db::traits::{NoOpReason, ReconcileError},
    db_types::{Order, OrderId, OrderStatusType, PaymentUpdate},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Move the order to `FINALIZED` and run the sale side effects.
    Finalize(OrderId),
    /// Attach the payment to a pending order for the first time.
    Link(OrderId),
    /// Update the mirrored processor status on the already-linked order.
    MirrorStatus(OrderId),
    /// Move the order to `CANCELLED`. `link` is set when the payment was resolved through the order reference.
    Cancel { order_id: OrderId, link: bool },
    /// Move the order to `REFUNDED` and restore stock.
    Refund(OrderId),
    NoOp(NoOpReason),
    /// No order could be found. Log and acknowledge.
    Dangling(String),
    /// The event cannot be processed.
    Fail(ReconcileError),
}

fn stale(order: &Order, event: &str) -> Decision {
    Decision::NoOp(NoOpReason::Stale { order_id: order.id.clone(), current: order.status, event: event.to_string() })
}

/// Takes the lifecycle edge from the order's current status to `next`. Orders with no such edge get a stale no-op.
fn advance(order: &Order, next: OrderStatusType, event: &str, decision: impl FnOnce(OrderId) -> Decision) -> Decision {
    if order.status.can_transition_to(next) {
        decision(order.id.clone())
    } else {
        stale(order, event)
    }
}

fn already_applied(order: &Order) -> Decision {
    Decision::NoOp(NoOpReason::AlreadyApplied { order_id: order.id.clone(), status: order.status })
}

pub fn decide_approval(linked: Option<&Order>, referenced: Option<&Order>, update: &PaymentUpdate) -> Decision {
    if let Some(order) = linked {
        return match order.status {
            // Linked by an earlier pending notification. The sale has not been recorded yet.
            OrderStatusType::PendingPayment => {
                advance(order, OrderStatusType::Finalized, "approved", Decision::Finalize)
            },
            OrderStatusType::Finalized => already_applied(order),
            OrderStatusType::Cancelled | OrderStatusType::Refunded => stale(order, "approved"),
        };
    }
    let Some(reference) = update.order_reference.as_ref() else {
        return Decision::Fail(ReconcileError::MissingReference(update.payment_id.clone()));
    };
    match referenced {
        None => Decision::Fail(ReconcileError::OrderNotFound(reference.clone())),
        Some(order) if order.status == OrderStatusType::PendingPayment => {
            advance(order, OrderStatusType::Finalized, "approved", Decision::Finalize)
        },
        Some(order) => {
            warn!(
                "🔄️ Payment {} approved for order {} which is already {}. The order is left alone.",
                update.payment_id, order.id, order.status
            );
            stale(order, "approved")
        },
    }
}

pub fn decide_pending(linked: Option<&Order>, referenced: Option<&Order>, update: &PaymentUpdate) -> Decision {
    if let Some(order) = linked {
        if order.status != OrderStatusType::PendingPayment {
            return stale(order, "pending");
        }
        if order.external_payment_status.as_deref() == Some(update.status.as_str()) {
            return Decision::NoOp(NoOpReason::StatusUnchanged {
                order_id: order.id.clone(),
                status: update.status.clone(),
            });
        }
        return Decision::MirrorStatus(order.id.clone());
    }
    let Some(reference) = update.order_reference.as_ref() else {
        return Decision::Dangling(format!("pending payment {} has no order reference", update.payment_id));
    };
    match referenced {
        None => Decision::Fail(ReconcileError::OrderNotFound(reference.clone())),
        Some(order) if order.status == OrderStatusType::PendingPayment => Decision::Link(order.id.clone()),
        Some(order) => stale(order, "pending"),
    }
}

pub fn decide_rejection(linked: Option<&Order>, referenced: Option<&Order>, update: &PaymentUpdate) -> Decision {
    let (order, link) = match (linked, referenced) {
        (Some(order), _) => (order, false),
        (None, Some(order)) => (order, true),
        (None, None) => {
            let reason = match update.order_reference.as_ref() {
                Some(reference) => format!("rejected payment {} references unknown order {reference}", update.payment_id),
                None => format!("rejected payment {} has no linked order and no order reference", update.payment_id),
            };
            return Decision::Dangling(reason);
        },
    };
    match order.status {
        OrderStatusType::PendingPayment => {
            advance(order, OrderStatusType::Cancelled, "rejected", |order_id| Decision::Cancel { order_id, link })
        },
        OrderStatusType::Cancelled => already_applied(order),
        OrderStatusType::Finalized | OrderStatusType::Refunded => stale(order, "rejected"),
    }
}

/// Refunds are only ever matched through the payment link. A refund for a payment that was never linked has nothing
/// to undo.
pub fn decide_refund(linked: Option<&Order>, update: &PaymentUpdate) -> Decision {
    let Some(order) = linked else {
        return Decision::Dangling(format!("refunded payment {} is not linked to any order", update.payment_id));
    };
    match order.status {
        OrderStatusType::Finalized => advance(order, OrderStatusType::Refunded, "refunded", Decision::Refund),
        OrderStatusType::Refunded => already_applied(order),
        OrderStatusType::PendingPayment | OrderStatusType::Cancelled => stale(order, "refunded"),
    }
}
