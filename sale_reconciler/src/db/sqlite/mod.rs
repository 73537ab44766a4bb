pub mod db;

pub mod customers;
pub mod orders;
pub mod products;
pub mod side_effects;
pub mod supplier_credits;

use std::{env, str::FromStr, time::Duration};

pub use db::SqliteDatabase;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite,
    SqlitePool,
    Transaction,
};

const SQLITE_DB_URL: &str = "sqlite://data/storefront.db";
/// How long a reconciliation waits for another one to release the write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("CSR_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ CSR_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Opens a transaction that already holds the database write lock, equivalent to `BEGIN IMMEDIATE`.
///
/// A plain deferred transaction only takes the write lock at its first write. Two deliveries of the same payment would
/// then both read the order as `PENDING_PAYMENT`, and the loser would fail on commit. Touching the lock row up front
/// makes the second delivery wait (up to the busy timeout) and then read the committed result of the first.
pub async fn begin_reconciliation(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE reconciliation_lock SET touched_at = CURRENT_TIMESTAMP WHERE id = 1").execute(&mut *tx).await?;
    Ok(tx)
}
