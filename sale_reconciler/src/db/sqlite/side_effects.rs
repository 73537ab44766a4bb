//! Inventory and supplier-ledger effects of order transitions.
//!
//! These functions never open their own transaction. Callers run them on the transaction that changed the order
//! status, so the effects commit or roll back together with it.
use log::debug;
use sqlx::SqliteConnection;

use super::{products, supplier_credits};
use crate::db_types::{NewSupplierCredit, OrderLine, SupplierCredit};

/// Applies a sale: every line item leaves stock and every consignment line credits its supplier.
pub async fn record_sale(lines: &[OrderLine], conn: &mut SqliteConnection) -> Result<Vec<SupplierCredit>, sqlx::Error> {
    let mut credits = Vec::new();
    for line in lines {
        products::decrement_stock(&line.product_id, line.quantity, conn).await?;
        if let Some(credit) = NewSupplierCredit::for_line(line) {
            credits.push(supplier_credits::insert_credit(credit, conn).await?);
        }
    }
    debug!("🗃️ Sale recorded: {} line(s), {} supplier credit(s)", lines.len(), credits.len());
    Ok(credits)
}

/// Puts the stock of a refunded sale back. Supplier ledger entries are not reversed.
pub async fn reverse_sale_inventory(lines: &[OrderLine], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for line in lines {
        products::restore_stock(&line.product_id, line.quantity, conn).await?;
    }
    debug!("🗃️ Stock restored for {} line(s)", lines.len());
    Ok(())
}
