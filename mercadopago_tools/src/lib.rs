//! A thin client for the parts of the Mercado Pago REST API that the payment reconciler consumes.
//!
//! Only read access is needed: when a webhook notification arrives, the full payment record is fetched with
//! [`MercadoPagoApi::fetch_payment`] and the authoritative status is taken from that response rather than from the
//! notification body.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod ids;

pub use api::MercadoPagoApi;
pub use config::MercadoPagoConfig;
pub use data_objects::{Payer, PaymentInfo, PaymentStatus};
pub use error::MercadoPagoApiError;
