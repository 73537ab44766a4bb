use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Customer, Money, Order, OrderId, OrderLine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub image_url: Option<String>,
}

/// Everything the order confirmation email needs, captured right after the order was finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub recipient: String,
    pub customer_name: Option<String>,
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    pub items: Vec<ConfirmationItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub shipping_address: Option<String>,
}

impl OrderConfirmation {
    /// Builds the confirmation for a finalized order.
    ///
    /// The recipient is the customer's stored email, falling back to the payer email the processor reported. Returns
    /// `None` when neither is available.
    pub fn new(order: &Order, customer: Option<&Customer>, lines: &[OrderLine], payer_email: Option<&str>) -> Option<Self> {
        let recipient = customer
            .and_then(Customer::contact_email)
            .or_else(|| payer_email.map(str::trim).filter(|e| !e.is_empty()))?
            .to_string();
        let items = lines
            .iter()
            .map(|line| ConfirmationItem {
                name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
                image_url: line.image_url.clone(),
            })
            .collect::<Vec<_>>();
        let subtotal = items.iter().map(|i| i.subtotal).sum();
        Some(Self {
            recipient,
            customer_name: customer.map(|c| c.name.clone()),
            order_id: order.id.clone(),
            order_date: order.created_at,
            items,
            subtotal,
            shipping: order.shipping_amount,
            total: order.total_amount,
            shipping_address: order.shipping_address.clone(),
        })
    }
}
