use log::{trace, warn};
use sqlx::SqliteConnection;

use crate::db_types::{Money, Product, ProductId, Supplier, SupplierId};

pub async fn fetch_product(product_id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn insert_product(
    id: &ProductId,
    name: &str,
    price: Money,
    stock_quantity: i64,
    supplier_id: Option<&SupplierId>,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
        INSERT INTO products (id, name, price, stock_quantity, supplier_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(price)
    .bind(stock_quantity)
    .bind(supplier_id)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn insert_supplier(
    id: &SupplierId,
    name: &str,
    payout_percentage: f64,
    conn: &mut SqliteConnection,
) -> Result<Supplier, sqlx::Error> {
    let supplier = sqlx::query_as("INSERT INTO suppliers (id, name, payout_percentage) VALUES ($1, $2, $3) RETURNING *")
        .bind(id)
        .bind(name)
        .bind(payout_percentage)
        .fetch_one(conn)
        .await?;
    Ok(supplier)
}

/// Takes `quantity` units out of stock and marks the product as sold. Stock never drops below zero.
pub async fn decrement_stock(
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            stock_quantity = MAX(stock_quantity - $1, 0),
            sold = TRUE,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        warn!("🗃️ Product {product_id} does not exist. Stock could not be decremented.");
    } else {
        trace!("🗃️ Decremented stock of {product_id} by {quantity}");
    }
    Ok(())
}

/// Returns `quantity` units to stock and clears the sold flag.
pub async fn restore_stock(
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            stock_quantity = stock_quantity + $1,
            sold = FALSE,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        warn!("🗃️ Product {product_id} does not exist. Stock could not be restored.");
    } else {
        trace!("🗃️ Restored {quantity} units of {product_id} to stock");
    }
    Ok(())
}
