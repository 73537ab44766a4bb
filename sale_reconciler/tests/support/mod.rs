#![allow(dead_code)]
use log::*;
use sale_reconciler::{
    db_types::{Money, NewOrder, PaymentUpdate, Product, ProductId},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_customer, seed_order, seed_product, seed_supplier},
    },
    ReconcilerApi,
    ReconcilerDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn setup(producers: EventProducers) -> ReconcilerApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    ReconcilerApi::new(db, producers)
}

pub async fn tear_down(mut api: ReconcilerApi<SqliteDatabase>) {
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    let url = api.db().url().to_string();
    Sqlite::drop_database(&url).await.expect("Error dropping test database");
}

/// Order `o1` for customer `c1`: one unit of consignment product `p1` (stock 5, supplier `s1` at 60%) for 100.00.
pub async fn seed_consignment_order(db: &SqliteDatabase) {
    seed_customer(db, "c1", "Ana Souza", Some("ana@example.com")).await;
    seed_supplier(db, "s1", "Atelier Barro", 60.0).await;
    seed_product(db, "p1", "Ceramic vase", 10_000, 5, Some("s1")).await;
    let order = NewOrder::new("o1".into(), Some("c1".into())).with_line("p1".into(), 1, Money::from(10_000));
    seed_order(db, order).await;
}

pub fn payment(id: &str, status: &str) -> PaymentUpdate {
    PaymentUpdate::new(id, status).with_reference("o1").with_amount(Money::from(10_000))
}

pub async fn product(db: &SqliteDatabase, id: &str) -> Product {
    db.fetch_product(&ProductId::from(id)).await.expect("Error fetching product").expect("Product does not exist")
}
