use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewSupplierCredit, OrderId, SupplierCredit, SupplierId};

/// Appends a `CREDIT` entry to the supplier ledger. A line item can only be credited once; a second insert for the
/// same item fails on the unique index.
pub async fn insert_credit(
    credit: NewSupplierCredit,
    conn: &mut SqliteConnection,
) -> Result<SupplierCredit, sqlx::Error> {
    let entry: SupplierCredit = sqlx::query_as(
        r#"
        INSERT INTO supplier_credits (supplier_id, order_id, order_item_id, amount, kind, description)
        VALUES ($1, $2, $3, $4, 'CREDIT', $5)
        RETURNING *
        "#,
    )
    .bind(credit.supplier_id)
    .bind(credit.order_id.as_str())
    .bind(credit.order_item_id)
    .bind(credit.amount)
    .bind(credit.description)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Supplier {} credited {} for order {}", entry.supplier_id, entry.amount, entry.order_id);
    Ok(entry)
}

pub async fn fetch_credits_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<SupplierCredit>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM supplier_credits WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn fetch_credits_for_supplier(
    supplier_id: &SupplierId,
    conn: &mut SqliteConnection,
) -> Result<Vec<SupplierCredit>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM supplier_credits WHERE supplier_id = $1 ORDER BY id")
        .bind(supplier_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
