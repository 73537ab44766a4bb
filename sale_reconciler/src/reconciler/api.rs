use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{NoOpReason, ReconcileError, ReconcilerDatabase, TransitionOutcome},
    db_types::{Order, PaymentEvent, PaymentUpdate},
    events::{EventProducers, OrderAnnulledEvent, OrderFinalizedEvent},
    reconciler::confirmation::OrderConfirmation,
};

/// `ReconcilerApi` is the primary API for applying classified payment events to orders.
///
/// Each event is handed to the backend, which applies it atomically. Once the backend has committed, the API publishes
/// the events that drive the non-transactional side effects, such as the confirmation email.
pub struct ReconcilerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconcilerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi")
    }
}

impl<B> ReconcilerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> ReconcilerApi<B>
where B: ReconcilerDatabase
{
    /// Routes the event to its branch.
    pub async fn reconcile(&self, event: PaymentEvent) -> Result<TransitionOutcome, ReconcileError> {
        match event {
            PaymentEvent::Approved(update) => self.approve_payment(update).await,
            PaymentEvent::Pending(update) => self.record_pending_payment(update).await,
            PaymentEvent::Rejected(update) => self.reject_payment(update).await,
            PaymentEvent::Refunded(update) => self.refund_payment(update).await,
            PaymentEvent::Unhandled { payment_id, status } => {
                info!("🔄️ Payment {payment_id} has status '{status}', which needs no action. Acknowledging.");
                Ok(TransitionOutcome::NoOp(NoOpReason::Unhandled { payment_id, status }))
            },
        }
    }

    /// Finalizes the order the payment pays for, and once that has committed, publishes the order confirmation.
    ///
    /// Failing to build or publish the confirmation never turns a committed finalization into an error.
    pub async fn approve_payment(&self, update: PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        trace!("🔄️✅️ Applying approved payment {}", update.payment_id);
        let outcome = self.db.apply_approval(&update).await.map_err(|e| {
            error!("🔄️✅️ Could not apply approved payment {}. {e}", update.payment_id);
            e
        })?;
        log_outcome(&update, &outcome);
        if let TransitionOutcome::Finalized(order) = &outcome {
            self.call_order_finalized_hook(order, &update).await;
        }
        Ok(outcome)
    }

    pub async fn record_pending_payment(&self, update: PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        trace!("🔄️⏳️ Applying pending payment {}", update.payment_id);
        let outcome = self.db.apply_pending(&update).await.map_err(|e| {
            error!("🔄️⏳️ Could not apply pending payment {}. {e}", update.payment_id);
            e
        })?;
        log_outcome(&update, &outcome);
        Ok(outcome)
    }

    pub async fn reject_payment(&self, update: PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        trace!("🔄️❌️ Applying rejected payment {}", update.payment_id);
        let outcome = self.db.apply_rejection(&update).await.map_err(|e| {
            error!("🔄️❌️ Could not apply rejected payment {}. {e}", update.payment_id);
            e
        })?;
        log_outcome(&update, &outcome);
        if let TransitionOutcome::Cancelled(order) = &outcome {
            self.call_order_annulled_hook(order).await;
        }
        Ok(outcome)
    }

    pub async fn refund_payment(&self, update: PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        trace!("🔄️↩️ Applying refunded payment {}", update.payment_id);
        let outcome = self.db.apply_refund(&update).await.map_err(|e| {
            error!("🔄️↩️ Could not apply refunded payment {}. {e}", update.payment_id);
            e
        })?;
        log_outcome(&update, &outcome);
        if let TransitionOutcome::Refunded(order) = &outcome {
            self.call_order_annulled_hook(order).await;
        }
        Ok(outcome)
    }

    async fn call_order_finalized_hook(&self, order: &Order, update: &PaymentUpdate) {
        if self.producers.order_finalized_producer.is_empty() {
            return;
        }
        let confirmation = match self.build_confirmation(order, update).await {
            Ok(Some(confirmation)) => confirmation,
            Ok(None) => {
                warn!(
                    "🔄️📧️ Order {} has no customer email and payment {} has no payer email. No confirmation will be \
                     sent.",
                    order.id, update.payment_id
                );
                return;
            },
            Err(e) => {
                error!("🔄️📧️ Could not gather the confirmation details for order {}. {e}", order.id);
                return;
            },
        };
        debug!("🔄️📧️ Notifying order finalized hook subscribers");
        for emitter in &self.producers.order_finalized_producer {
            let event = OrderFinalizedEvent::new(order.clone(), confirmation.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn build_confirmation(
        &self,
        order: &Order,
        update: &PaymentUpdate,
    ) -> Result<Option<OrderConfirmation>, ReconcileError> {
        let customer = match order.customer_id.as_deref() {
            Some(id) => self.db.fetch_customer(id).await?,
            None => None,
        };
        let lines = self.db.fetch_order_lines(&order.id).await?;
        Ok(OrderConfirmation::new(order, customer.as_ref(), &lines, update.payer_email.as_deref()))
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🔄️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }
}

fn log_outcome(update: &PaymentUpdate, outcome: &TransitionOutcome) {
    match outcome {
        TransitionOutcome::NoOp(reason) => info!("🔄️ Payment {} ({}): {reason}", update.payment_id, update.status),
        TransitionOutcome::Dangling(reason) => warn!("🔄️ Payment {} could not be matched: {reason}", update.payment_id),
        outcome => info!("🔄️ Payment {} ({}): {outcome}", update.payment_id, update.status),
    }
}
