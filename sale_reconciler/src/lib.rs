//! Sale Reconciler
//!
//! The sale reconciler turns asynchronous payment notifications from the payment processor into order state changes.
//! Notifications are delivered at least once and in no particular order, so every state change is idempotent and
//! keyed on the processor's payment id.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. Callers should not touch the
//!    database directly but use the reconciler API. The data types stored in the database live in [`db_types`].
//! 2. The reconciler public API ([`ReconcilerApi`]). It runs each classified payment event through the order state
//!    machine. The state machine itself is a set of pure decision functions in [`transitions`], which the backend
//!    evaluates inside a single database transaction together with the inventory and supplier-ledger side effects.
//! 3. Events ([`events`]). Side effects that must not take part in the transaction, such as sending the order
//!    confirmation email, subscribe to events that are published after the transaction has committed.
mod db;

pub mod db_types;
pub mod events;
mod reconciler;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{NoOpReason, ReconcileError, ReconcilerDatabase, TransitionOutcome};
pub use reconciler::{
    api::ReconcilerApi,
    confirmation::{ConfirmationItem, OrderConfirmation},
    transitions,
};
