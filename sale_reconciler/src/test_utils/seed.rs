//! Catalogue and order seeding. In production, the checkout flow creates these rows.
use crate::{
    db::sqlite::{customers, orders, products},
    db_types::{Customer, Money, NewOrder, Order, Product, ProductId, Supplier, SupplierId},
    SqliteDatabase,
};

pub async fn seed_customer(db: &SqliteDatabase, id: &str, name: &str, email: Option<&str>) -> Customer {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    customers::insert_customer(id, name, email, &mut conn).await.expect("Error inserting customer")
}

pub async fn seed_supplier(db: &SqliteDatabase, id: &str, name: &str, payout_percentage: f64) -> Supplier {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    products::insert_supplier(&SupplierId::from(id), name, payout_percentage, &mut conn)
        .await
        .expect("Error inserting supplier")
}

pub async fn seed_product(
    db: &SqliteDatabase,
    id: &str,
    name: &str,
    price: i64,
    stock_quantity: i64,
    supplier_id: Option<&str>,
) -> Product {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let supplier_id = supplier_id.map(SupplierId::from);
    products::insert_product(
        &ProductId::from(id),
        name,
        Money::from(price),
        stock_quantity,
        supplier_id.as_ref(),
        &mut conn,
    )
    .await
    .expect("Error inserting product")
}

/// Inserts the order and its line items in one transaction. The order starts in `PENDING_PAYMENT`.
pub async fn seed_order(db: &SqliteDatabase, order: NewOrder) -> Order {
    let mut tx = db.pool().begin().await.expect("Error starting transaction");
    let order = orders::insert_order(order, &mut tx).await.expect("Error inserting order");
    tx.commit().await.expect("Error committing order");
    order
}
