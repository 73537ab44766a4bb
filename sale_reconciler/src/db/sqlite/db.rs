//! `SqliteDatabase` is the SQLite implementation of a sale reconciler backend.
//!
//! Every `apply_*` call opens one transaction with [`begin_reconciliation`], which holds the write lock for its whole
//! duration. Lookups, the decision and all writes happen inside it, so deliveries of the same payment are serialized
//! and each one sees the committed result of the previous one.
use std::fmt::Debug;

use log::*;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use super::{begin_reconciliation, customers, db_url, new_pool, orders, products, side_effects, supplier_credits};
use crate::{
    db::traits::{ReconcileError, ReconcilerDatabase, TransitionOutcome},
    db_types::{
        Customer,
        Order,
        OrderId,
        OrderLine,
        OrderStatusType,
        PaymentId,
        PaymentUpdate,
        Product,
        ProductId,
        SupplierCredit,
        SupplierId,
    },
    transitions::{self, Decision},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

/// The order linked to the payment, and when there is none, the order named by the payment's reference.
async fn lookup_orders(
    update: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<(Option<Order>, Option<Order>), sqlx::Error> {
    let linked = orders::fetch_order_by_payment_id(&update.payment_id, conn).await?;
    let referenced = match (&linked, &update.order_reference) {
        (None, Some(reference)) => orders::fetch_order(reference, conn).await?,
        _ => None,
    };
    Ok((linked, referenced))
}

/// Outcomes that need no writes. The transaction is dropped, which rolls it back.
fn settle_without_writes(decision: Decision, tx: Transaction<'_, Sqlite>) -> Result<TransitionOutcome, ReconcileError> {
    drop(tx);
    match decision {
        Decision::NoOp(reason) => Ok(TransitionOutcome::NoOp(reason)),
        Decision::Dangling(reason) => Ok(TransitionOutcome::Dangling(reason)),
        Decision::Fail(e) => Err(e),
        other => {
            error!("🗃️ Decision {other:?} reached the no-write path. This is a bug.");
            Err(ReconcileError::DatabaseError(format!("unexpected decision {other:?}")))
        },
    }
}

impl ReconcilerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_id(&self, payment_id: &PaymentId) -> Result<Option<Order>, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_payment_id(payment_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_lines(&self, order_id: &OrderId) -> Result<Vec<OrderLine>, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        let lines = orders::fetch_order_lines(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<Option<Customer>, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        let customer = customers::fetch_customer(customer_id, &mut conn).await?;
        Ok(customer)
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_credits_for_order(&self, order_id: &OrderId) -> Result<Vec<SupplierCredit>, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        let credits = supplier_credits::fetch_credits_for_order(order_id, &mut conn).await?;
        Ok(credits)
    }

    async fn fetch_credits_for_supplier(
        &self,
        supplier_id: &SupplierId,
    ) -> Result<Vec<SupplierCredit>, ReconcileError> {
        let mut conn = self.pool.acquire().await?;
        let credits = supplier_credits::fetch_credits_for_supplier(supplier_id, &mut conn).await?;
        Ok(credits)
    }

    async fn apply_approval(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        let mut tx = begin_reconciliation(&self.pool).await?;
        let (linked, referenced) = lookup_orders(update, &mut tx).await?;
        let order_id = match transitions::decide_approval(linked.as_ref(), referenced.as_ref(), update) {
            Decision::Finalize(order_id) => order_id,
            other => return settle_without_writes(other, tx),
        };
        let order = orders::compare_and_set_status(
            &order_id,
            OrderStatusType::PendingPayment,
            OrderStatusType::Finalized,
            update,
            &mut tx,
        )
        .await?
        .ok_or_else(|| ReconcileError::ConcurrentModification(order_id.clone()))?;
        let lines = orders::fetch_order_lines(&order_id, &mut tx).await?;
        let credits = side_effects::record_sale(&lines, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Order {order_id} finalized by payment {}. {} line(s) sold, {} supplier credit(s) recorded.",
            update.payment_id,
            lines.len(),
            credits.len()
        );
        Ok(TransitionOutcome::Finalized(order))
    }

    async fn apply_pending(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        let mut tx = begin_reconciliation(&self.pool).await?;
        let (linked, referenced) = lookup_orders(update, &mut tx).await?;
        let order_id = match transitions::decide_pending(linked.as_ref(), referenced.as_ref(), update) {
            Decision::Link(order_id) | Decision::MirrorStatus(order_id) => order_id,
            other => return settle_without_writes(other, tx),
        };
        let order = orders::link_payment(&order_id, update, &mut tx)
            .await?
            .ok_or_else(|| ReconcileError::ConcurrentModification(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} now mirrors payment {} status '{}'", update.payment_id, update.status);
        Ok(TransitionOutcome::StatusMirrored(order))
    }

    async fn apply_rejection(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        let mut tx = begin_reconciliation(&self.pool).await?;
        let (linked, referenced) = lookup_orders(update, &mut tx).await?;
        let order_id = match transitions::decide_rejection(linked.as_ref(), referenced.as_ref(), update) {
            Decision::Cancel { order_id, link } => {
                if link {
                    debug!("🗃️ Rejected payment {} resolved to order {order_id} by reference", update.payment_id);
                }
                order_id
            },
            other => return settle_without_writes(other, tx),
        };
        let order = orders::compare_and_set_status(
            &order_id,
            OrderStatusType::PendingPayment,
            OrderStatusType::Cancelled,
            update,
            &mut tx,
        )
        .await?
        .ok_or_else(|| ReconcileError::ConcurrentModification(order_id.clone()))?;
        tx.commit().await?;
        info!("🗃️ Order {order_id} cancelled. Payment {} was {}", update.payment_id, update.status);
        Ok(TransitionOutcome::Cancelled(order))
    }

    async fn apply_refund(&self, update: &PaymentUpdate) -> Result<TransitionOutcome, ReconcileError> {
        let mut tx = begin_reconciliation(&self.pool).await?;
        let linked = orders::fetch_order_by_payment_id(&update.payment_id, &mut tx).await?;
        let order_id = match transitions::decide_refund(linked.as_ref(), update) {
            Decision::Refund(order_id) => order_id,
            other => return settle_without_writes(other, tx),
        };
        let order = orders::compare_and_set_status(
            &order_id,
            OrderStatusType::Finalized,
            OrderStatusType::Refunded,
            update,
            &mut tx,
        )
        .await?
        .ok_or_else(|| ReconcileError::ConcurrentModification(order_id.clone()))?;
        let lines = orders::fetch_order_lines(&order_id, &mut tx).await?;
        side_effects::reverse_sale_inventory(&lines, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order {order_id} refunded. Stock restored for {} line(s).", lines.len());
        Ok(TransitionOutcome::Refunded(order))
    }

    async fn close(&mut self) -> Result<(), ReconcileError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
