use sqlx::SqliteConnection;

use crate::db_types::Customer;

pub async fn fetch_customer(customer_id: &str, conn: &mut SqliteConnection) -> Result<Option<Customer>, sqlx::Error> {
    let customer =
        sqlx::query_as("SELECT * FROM customers WHERE id = $1").bind(customer_id).fetch_optional(conn).await?;
    Ok(customer)
}

pub async fn insert_customer(
    id: &str,
    name: &str,
    email: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Customer, sqlx::Error> {
    let customer = sqlx::query_as("INSERT INTO customers (id, name, email) VALUES ($1, $2, $3) RETURNING *")
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_one(conn)
        .await?;
    Ok(customer)
}
