//! Order confirmation emails.
//!
//! Emails are sent from an `on_order_finalized` hook, i.e. after the finalization has committed. A failed send is
//! logged and dropped. It never affects the order.
use std::{fmt::Write, future::Future, pin::Pin, sync::Arc};

use htmlescape::{encode_attribute, encode_minimal};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use sale_reconciler::{
    events::{EventHandlers, EventHooks, OrderAnnulledEvent, OrderFinalizedEvent},
    OrderConfirmation,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::MailerConfig;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Could not initialize the mail client. {0}")]
    Initialization(String),
    #[error("Could not reach the email API. {0}")]
    Transport(String),
    #[error("The email API rejected the message. Error {status}. {message}")]
    Rejected { status: u16, message: String },
}

impl From<reqwest::Error> for MailerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone)]
pub struct ConfirmationMailer {
    config: MailerConfig,
    client: Arc<Client>,
}

impl ConfirmationMailer {
    pub fn new(config: MailerConfig) -> Result<Self, MailerError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| MailerError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| MailerError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn send_confirmation(&self, confirmation: &OrderConfirmation) -> Result<(), MailerError> {
        let email = render_confirmation(confirmation);
        let message = EmailMessage {
            from: &self.config.from,
            to: &confirmation.recipient,
            subject: &email.subject,
            html: &email.html,
        };
        trace!("📧️ Sending confirmation for order {} to {}", confirmation.order_id, confirmation.recipient);
        let response = self.client.post(&self.config.api_url).json(&message).send().await?;
        if response.status().is_success() {
            info!("📧️ Sent order confirmation for {} to {}", confirmation.order_id, confirmation.recipient);
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(MailerError::Rejected { status, message })
        }
    }
}

pub fn render_confirmation(confirmation: &OrderConfirmation) -> RenderedEmail {
    let subject = format!("Order confirmed: {}", confirmation.order_id.as_str());
    let greeting = match &confirmation.customer_name {
        Some(name) => format!("Hi {},", encode_minimal(name)),
        None => "Hi,".to_string(),
    };
    let mut rows = String::new();
    for item in &confirmation.items {
        let image = item
            .image_url
            .as_deref()
            .map(|url| format!(r#"<img src="{}" alt="" width="64"/>"#, encode_attribute(url)))
            .unwrap_or_default();
        // Writing to a String cannot fail
        let _ = write!(
            rows,
            "<tr><td>{image}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            encode_minimal(&item.name),
            item.quantity,
            item.unit_price,
            item.subtotal
        );
    }
    let address = confirmation
        .shipping_address
        .as_deref()
        .map(|a| format!("<p>Shipping to: {}</p>", encode_minimal(a)))
        .unwrap_or_default();
    let html = format!(
        "<html><body><p>{greeting}</p><p>Thank you for your purchase. Your payment for order <b>{order_id}</b> placed \
         on {date} has been confirmed.</p><table><tr><th></th><th>Item</th><th>Qty</th><th>Price</th><th>Subtotal</th>\
         </tr>{rows}</table><p>Subtotal: {subtotal}<br/>Shipping: {shipping}<br/><b>Total: {total}</b></p>{address}\
         </body></html>",
        order_id = encode_minimal(confirmation.order_id.as_str()),
        date = confirmation.order_date.format("%Y-%m-%d"),
        subtotal = confirmation.subtotal,
        shipping = confirmation.shipping,
        total = confirmation.total,
    );
    RenderedEmail { subject, html }
}

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Registers the server's event hooks.
///
/// * `on_order_finalized` sends the confirmation email, if a mailer is configured.
/// * `on_order_annulled` logs the cancellation or refund.
pub fn create_event_handlers(buffer_size: usize, mailer: Option<ConfirmationMailer>) -> EventHandlers {
    let mut hooks = EventHooks::default();
    if let Some(mailer) = mailer {
        hooks.on_order_finalized(move |ev: OrderFinalizedEvent| {
            let mailer = mailer.clone();
            Box::pin(async move {
                if let Err(e) = mailer.send_confirmation(&ev.confirmation).await {
                    error!("📧️ Could not send the confirmation for order {}. {e}", ev.order.id);
                }
            }) as BoxedFuture
        });
    } else {
        info!("📧️ No mailer is configured. Order confirmations will not be sent.");
    }
    hooks.on_order_annulled(|ev: OrderAnnulledEvent| {
        Box::pin(async move {
            info!("🪝️ Order {} is now {}", ev.order.id, ev.status);
        }) as BoxedFuture
    });
    EventHandlers::new(buffer_size, hooks)
}
