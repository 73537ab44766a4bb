//! Event classification for Mercado Pago notifications.
//!
//! A notification only says that *something* happened to a payment. The authoritative status, the order reference
//! and the payer are fetched from the processor and turned into a [`PaymentEvent`] here. This is the only place where
//! the processor's status strings are interpreted.
use log::*;
use mercadopago_tools::{ids::is_plain_id, MercadoPagoApi, MercadoPagoApiError, PaymentInfo, PaymentStatus};
use sale_reconciler::db_types::{Money, OrderId, PaymentEvent, PaymentUpdate};
use thiserror::Error;

use crate::data_objects::PaymentNotification;

/// The processor lookup the classifier depends on.
#[allow(async_fn_in_trait)]
pub trait PaymentInfoProvider {
    async fn fetch_payment_info(&self, payment_id: &str) -> Result<PaymentInfo, MercadoPagoApiError>;
}

impl PaymentInfoProvider for MercadoPagoApi {
    async fn fetch_payment_info(&self, payment_id: &str) -> Result<PaymentInfo, MercadoPagoApiError> {
        self.fetch_payment(payment_id).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Not a payment notification. Acknowledged without further work.
    Ignored(String),
    Event(PaymentEvent),
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("The notification does not carry a payment id")]
    MissingPaymentId,
    #[error("'{0}' is not a valid payment id")]
    InvalidPaymentId(String),
    #[error("Could not fetch payment {payment_id} from the processor. {source}")]
    FetchFailed {
        payment_id: String,
        #[source]
        source: MercadoPagoApiError,
    },
}

impl ClassificationError {
    /// Whether the processor's own redelivery of the notification is likely to succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MissingPaymentId | Self::InvalidPaymentId(_) => false,
            Self::FetchFailed { source, .. } => source.is_retryable(),
        }
    }
}

pub async fn classify_notification<P: PaymentInfoProvider>(
    notification: &PaymentNotification,
    provider: &P,
) -> Result<Classification, ClassificationError> {
    if !notification.is_payment() {
        let reason = format!("Notifications of type '{}' are not processed", notification.notification_type);
        debug!("📬️ {reason}");
        return Ok(Classification::Ignored(reason));
    }
    let payment_id = notification.data.id.trim();
    if payment_id.is_empty() {
        return Err(ClassificationError::MissingPaymentId);
    }
    if !is_plain_id(payment_id) {
        return Err(ClassificationError::InvalidPaymentId(payment_id.to_string()));
    }
    let info = provider
        .fetch_payment_info(payment_id)
        .await
        .map_err(|source| ClassificationError::FetchFailed { payment_id: payment_id.to_string(), source })?;
    if info.id != payment_id {
        warn!("📬️ Notification for payment {payment_id} returned payment {}. Using the latter.", info.id);
    }
    let event = payment_event_from_info(&info);
    debug!("📬️ Payment {payment_id} has status '{}'", info.status);
    Ok(Classification::Event(event))
}

/// Maps the processor's view of a payment onto one of the reconciler's branches.
///
/// | Status                      | Branch     |
/// |-----------------------------|------------|
/// | approved                    | Approved   |
/// | pending, in_process         | Pending    |
/// | rejected, cancelled         | Rejected   |
/// | refunded, charged_back      | Refunded   |
/// | anything else               | Unhandled  |
pub fn payment_event_from_info(info: &PaymentInfo) -> PaymentEvent {
    match &info.status {
        PaymentStatus::Approved => PaymentEvent::Approved(payment_update(info)),
        PaymentStatus::Pending | PaymentStatus::InProcess => PaymentEvent::Pending(payment_update(info)),
        PaymentStatus::Rejected | PaymentStatus::Cancelled => PaymentEvent::Rejected(payment_update(info)),
        PaymentStatus::Refunded | PaymentStatus::ChargedBack => PaymentEvent::Refunded(payment_update(info)),
        PaymentStatus::Authorized | PaymentStatus::InMediation | PaymentStatus::Other(_) => {
            PaymentEvent::Unhandled { payment_id: info.id.as_str().into(), status: info.status.to_string() }
        },
    }
}

fn payment_update(info: &PaymentInfo) -> PaymentUpdate {
    let amount = Money::from_major(info.transaction_amount).unwrap_or_else(|e| {
        warn!("📬️ Payment {} has an unusable amount. {e}", info.id);
        Money::default()
    });
    PaymentUpdate {
        payment_id: info.id.as_str().into(),
        status: info.status.to_string(),
        order_reference: info.order_reference().map(OrderId::from),
        payer_email: info.payer_email().map(String::from),
        amount,
        approved_at: info.date_approved.or(info.date_created),
    }
}
