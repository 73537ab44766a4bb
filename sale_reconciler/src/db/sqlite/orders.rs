use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, Order, OrderId, OrderLine, OrderStatusType, PaymentId, PaymentUpdate};

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                customer_id,
                total_amount,
                shipping_amount,
                shipping_address
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.id.as_str())
    .bind(order.customer_id)
    .bind(order.total_amount)
    .bind(order.shipping_amount)
    .bind(order.shipping_address)
    .fetch_one(&mut *conn)
    .await?;
    for line in order.lines {
        let subtotal = line.subtotal();
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(inserted.id.as_str())
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(subtotal)
        .execute(&mut *conn)
        .await?;
    }
    debug!("🗃️ Order {} inserted", inserted.id);
    Ok(inserted)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the order linked to the given processor payment id. There is at most one.
pub async fn fetch_order_by_payment_id(
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE external_payment_id = $1")
        .bind(payment_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_lines(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
        SELECT
            order_items.id AS item_id,
            order_items.order_id,
            order_items.product_id,
            products.name AS product_name,
            products.image_url,
            order_items.quantity,
            order_items.unit_price,
            order_items.subtotal,
            products.supplier_id,
            suppliers.payout_percentage
        FROM order_items
            JOIN products ON products.id = order_items.product_id
            LEFT JOIN suppliers ON suppliers.id = products.supplier_id
        WHERE order_items.order_id = $1
        ORDER BY order_items.id
        "#,
    )
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// Moves the order from `expected` to `next`, recording the payment against it.
///
/// The update only applies if the order is still in `expected`, so `None` means another writer got there first.
/// `paid_at` is stamped when the order is finalized.
pub(crate) async fn compare_and_set_status(
    order_id: &OrderId,
    expected: OrderStatusType,
    next: OrderStatusType,
    payment: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let paid_at = (next == OrderStatusType::Finalized).then(|| payment.approved_at.unwrap_or_else(Utc::now));
    trace!("🗃️ Order {order_id}: {expected} -> {next} for payment {}", payment.payment_id);
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $1,
            external_payment_id = $2,
            external_payment_status = $3,
            paid_at = COALESCE($4, paid_at),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $5 AND status = $6
        RETURNING *
        "#,
    )
    .bind(next.as_str())
    .bind(payment.payment_id.as_str())
    .bind(payment.status.as_str())
    .bind(paid_at)
    .bind(order_id.as_str())
    .bind(expected.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Links the payment to an order that is still waiting for payment and mirrors the processor status. The lifecycle
/// status is left alone.
pub(crate) async fn link_payment(
    order_id: &OrderId,
    payment: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            external_payment_id = $1,
            external_payment_status = $2,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $3 AND status = 'PENDING_PAYMENT'
        RETURNING *
        "#,
    )
    .bind(payment.payment_id.as_str())
    .bind(payment.status.as_str())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
