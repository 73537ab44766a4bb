use thiserror::Error;

use crate::{
    db::traits::TransitionOutcome,
    db_types::{Customer, Order, OrderId, OrderLine, PaymentId, PaymentUpdate, Product, ProductId, SupplierCredit, SupplierId},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment {0} is not linked to an order and carries no order reference")]
    MissingReference(PaymentId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} changed status while it was being reconciled")]
    ConcurrentModification(OrderId),
}

impl From<sqlx::Error> for ReconcileError {
    fn from(e: sqlx::Error) -> Self {
        ReconcileError::DatabaseError(e.to_string())
    }
}

/// This trait defines the behaviour for backends supporting the sale reconciler.
///
/// The `apply_*` methods must each run as one atomic unit: either the status change and all of its side effects are
/// persisted, or nothing is. Two calls for the same payment id, however they interleave, must leave the database as
/// a single call would.
#[allow(async_fn_in_trait)]
pub trait ReconcilerDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, ReconcileError>;

    /// Fetches the order linked to the given processor payment id, if any.
    async fn fetch_order_by_payment_id(&self, payment_id: &PaymentId) -> Result<Option<Order>, ReconcileError>;

    /// Fetches the line items for the order, with product and supplier details.
    async fn fetch_order_lines(&self, order_id: &OrderId) -> Result<Vec<OrderLine>, ReconcileError>;

    async fn fetch_customer(&self, customer_id: &str) -> Result<Option<Customer>, ReconcileError>;

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, ReconcileError>;

    async fn fetch_credits_for_order(&self, order_id: &OrderId) -> Result<Vec<SupplierCredit>, ReconcileError>;

    async fn fetch_credits_for_supplier(&self, supplier_id: &SupplierId)
        -> Result<Vec<SupplierCredit>, ReconcileError>;

    /// Handles an approved payment. When the order is waiting for payment it is finalized, stock is decremented for
    /// every line item and every consignment line credits its supplier.
    async fn apply_approval(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError>;

    /// Handles a payment that is still in flight. The payment is linked to the order and its processor status is
    /// mirrored. The order lifecycle status is never changed.
    async fn apply_pending(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError>;

    /// Handles a rejected or cancelled payment. An order still waiting for payment is cancelled.
    async fn apply_rejection(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError>;

    /// Handles a refunded payment. A finalized order linked to the payment is marked refunded and its stock restored.
    async fn apply_refund(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconcileError> {
        Ok(())
    }
}
