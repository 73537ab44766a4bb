//! # Sale reconciler server
//! This crate hosts the HTTP service in front of the sale reconciler. It is responsible for:
//! * Listening for payment notifications from Mercado Pago.
//! * Checking each notification's signature against the shared webhook secret.
//! * Fetching the payment from the processor and classifying it into a payment event.
//! * Handing the event to the [`sale_reconciler::ReconcilerApi`], and sending order confirmations once an order has
//!   been finalized.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhooks/mercadopago`: The webhook route for Mercado Pago payment notifications.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;
pub mod signature;

#[cfg(test)]
mod endpoint_tests;
