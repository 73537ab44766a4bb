use std::time::Duration;

use csr_common::Secret;
use log::*;

pub const DEFAULT_MP_API_URL: &str = "https://api.mercadopago.com";
pub const DEFAULT_MP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    /// Base url of the REST API, without a trailing slash.
    pub api_url: String,
    pub access_token: Secret<String>,
    /// Upper bound on a single payment lookup. A timeout is reported as a retryable error.
    pub timeout: Duration,
}

impl Default for MercadoPagoConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_MP_API_URL.to_string(), access_token: Secret::default(), timeout: DEFAULT_MP_TIMEOUT }
    }
}

impl MercadoPagoConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("CSR_MP_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("CSR_MP_API_URL not set, using {DEFAULT_MP_API_URL}");
                DEFAULT_MP_API_URL.to_string()
            });
        let access_token = Secret::new(std::env::var("CSR_MP_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("CSR_MP_ACCESS_TOKEN not set. Payment lookups will be rejected by the processor.");
            String::default()
        }));
        let timeout = std::env::var("CSR_MP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for CSR_MP_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MP_TIMEOUT);
        Self { api_url, access_token, timeout }
    }
}
