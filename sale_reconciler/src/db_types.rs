use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use csr_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       PaymentId       ---------------------------------------------------------
/// The payment processor's identifier for a payment. This is the idempotency key for everything the reconciler does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl<S: Into<String>> From<S> for PaymentId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  ProductId/SupplierId ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl<S: Into<String>> From<S> for ProductId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SupplierId(pub String);

impl<S: Into<String>> From<S> for SupplierId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for SupplierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been placed and the storefront is waiting for the payment processor to confirm payment.
    PendingPayment,
    /// Payment was approved. Stock has been decremented and suppliers have been credited.
    Finalized,
    /// The payment was rejected or cancelled before the order was finalized.
    Cancelled,
    /// A finalized order whose payment was refunded.
    Refunded,
}

impl OrderStatusType {
    /// Terminal states never change again, whatever notifications arrive afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// The order lifecycle edges. Everything else is rejected by the reconciler.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Finalized) |
                (Self::PendingPayment, Self::Cancelled) |
                (Self::Finalized, Self::Refunded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Finalized => "FINALIZED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(Self::PendingPayment),
            "FINALIZED" => Ok(Self::Finalized),
            "CANCELLED" => Ok(Self::Cancelled),
            "REFUNDED" => Ok(Self::Refunded),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: Option<String>,
    pub status: OrderStatusType,
    /// The processor's payment id, once a notification has been linked to this order.
    pub external_payment_id: Option<PaymentId>,
    /// The processor's status string for the linked payment, mirrored verbatim.
    pub external_payment_status: Option<String>,
    pub total_amount: Money,
    pub shipping_amount: Money,
    pub shipping_address: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer_id: Option<String>,
    pub total_amount: Money,
    pub shipping_amount: Money,
    pub shipping_address: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn new(id: OrderId, customer_id: Option<String>) -> Self {
        Self {
            id,
            customer_id,
            total_amount: Money::default(),
            shipping_amount: Money::default(),
            shipping_address: None,
            lines: Vec::new(),
        }
    }

    /// Adds a line item, keeping the order total equal to the sum of subtotals plus shipping.
    pub fn with_line(mut self, product_id: ProductId, quantity: i64, unit_price: Money) -> Self {
        let line = NewOrderLine { product_id, quantity, unit_price };
        self.total_amount = self.total_amount + line.subtotal();
        self.lines.push(line);
        self
    }

    pub fn with_shipping(mut self, amount: Money, address: &str) -> Self {
        self.total_amount = self.total_amount - self.shipping_amount + amount;
        self.shipping_amount = amount;
        self.shipping_address = Some(address.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl NewOrderLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------      OrderLine        ---------------------------------------------------------
/// An order line item joined with the product and supplier details the side effects need.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    /// Set when the product is held on consignment
    pub supplier_id: Option<SupplierId>,
    pub payout_percentage: Option<f64>,
}

impl OrderLine {
    /// The supplier and its payout share, when this line is a consignment sale.
    pub fn consignment(&self) -> Option<(&SupplierId, f64)> {
        match (&self.supplier_id, self.payout_percentage) {
            (Some(supplier), Some(pct)) => Some((supplier, pct)),
            _ => None,
        }
    }
}

//--------------------------------------  Customer / Product   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn contact_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Money,
    pub stock_quantity: i64,
    pub sold: bool,
    pub supplier_id: Option<SupplierId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    /// The share of each sale paid out to the supplier, 0 to 100.
    pub payout_percentage: f64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   Supplier ledger     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    Credit,
    Debit,
}

impl Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryKind::Credit => write!(f, "CREDIT"),
            LedgerEntryKind::Debit => write!(f, "DEBIT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SupplierCredit {
    pub id: i64,
    pub supplier_id: SupplierId,
    pub order_id: OrderId,
    pub order_item_id: i64,
    pub amount: Money,
    pub kind: LedgerEntryKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSupplierCredit {
    pub supplier_id: SupplierId,
    pub order_id: OrderId,
    pub order_item_id: i64,
    pub amount: Money,
    pub description: String,
}

impl NewSupplierCredit {
    /// The credit owed to the supplier for a consignment line. Returns `None` for lines the store owns outright.
    pub fn for_line(line: &OrderLine) -> Option<Self> {
        let (supplier, pct) = line.consignment()?;
        Some(Self {
            supplier_id: supplier.clone(),
            order_id: line.order_id.clone(),
            order_item_id: line.item_id,
            amount: line.subtotal.percentage(pct),
            description: format!(
                "Consignment sale of {}x {} (order {})",
                line.quantity,
                line.product_name,
                line.order_id.as_str()
            ),
        })
    }
}

//--------------------------------------   Payment events      ---------------------------------------------------------
/// Everything the reconciler knows about a payment after it has been fetched from the processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub payment_id: PaymentId,
    /// The processor's status string, stored verbatim on the linked order.
    pub status: String,
    /// The merchant reference the checkout attached to the payment, i.e. our order id.
    pub order_reference: Option<OrderId>,
    pub payer_email: Option<String>,
    pub amount: Money,
    pub approved_at: Option<DateTime<Utc>>,
}

impl PaymentUpdate {
    pub fn new<P: Into<PaymentId>, S: Into<String>>(payment_id: P, status: S) -> Self {
        Self {
            payment_id: payment_id.into(),
            status: status.into(),
            order_reference: None,
            payer_email: None,
            amount: Money::default(),
            approved_at: None,
        }
    }

    pub fn with_reference(mut self, order_id: &str) -> Self {
        self.order_reference = Some(OrderId::from(order_id));
        self
    }

    pub fn with_payer_email(mut self, email: &str) -> Self {
        self.payer_email = Some(email.to_string());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }
}

/// A classified payment notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaymentEvent {
    Approved(PaymentUpdate),
    Pending(PaymentUpdate),
    Rejected(PaymentUpdate),
    Refunded(PaymentUpdate),
    /// A status the reconciler has no transition for. It is acknowledged and otherwise ignored.
    Unhandled { payment_id: PaymentId, status: String },
}

impl PaymentEvent {
    pub fn payment_id(&self) -> &PaymentId {
        match self {
            PaymentEvent::Approved(u) |
            PaymentEvent::Pending(u) |
            PaymentEvent::Rejected(u) |
            PaymentEvent::Refunded(u) => &u.payment_id,
            PaymentEvent::Unhandled { payment_id, .. } => payment_id,
        }
    }
}
