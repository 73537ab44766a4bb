//! #  Database management and control.
//!
//! This module defines the interface contract of the reconciler database *backends*.
//!
//! The [`ReconcilerDatabase`] trait exposes read access to orders, line items, customers, products and the supplier
//! ledger, plus one `apply_*` method per payment event branch. Each `apply_*` call is a single atomic unit of work:
//! the backend looks up the affected order, asks the pure decision functions in [`crate::transitions`] what to do, and
//! performs the status change together with its inventory and ledger side effects, or nothing at all.
//!
//! The result of every `apply_*` call is a [`TransitionOutcome`]. Errors are reported as [`ReconcileError`].
mod data_objects;
mod reconciler_database;

pub use data_objects::{NoOpReason, TransitionOutcome};
pub use reconciler_database::{ReconcileError, ReconcilerDatabase};
