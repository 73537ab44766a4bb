use std::env;

use csr_common::{parse_boolean_flag, Secret};
use log::*;
use mercadopago_tools::MercadoPagoConfig;

const DEFAULT_CSR_HOST: &str = "127.0.0.1";
const DEFAULT_CSR_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The secret shared with the payment processor for signing webhook notifications. When `None`, signature checks
    /// are disabled. **Never run production like this.**
    pub webhook_secret: Option<Secret<String>>,
    /// Capacity of each event hook channel.
    pub event_buffer_size: usize,
    pub mercadopago: MercadoPagoConfig,
    /// Order confirmation emails are only sent when this is set.
    pub mailer: Option<MailerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CSR_HOST.to_string(),
            port: DEFAULT_CSR_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            webhook_secret: None,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            mercadopago: MercadoPagoConfig::default(),
            mailer: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CSR_HOST").ok().unwrap_or_else(|| DEFAULT_CSR_HOST.into());
        let port = env::var("CSR_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CSR_PORT. {e} Using the default, {DEFAULT_CSR_PORT}, instead."
                    );
                    DEFAULT_CSR_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CSR_PORT);
        let database_url = env::var("CSR_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CSR_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let webhook_secret = env::var("CSR_MP_WEBHOOK_SECRET").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        if webhook_secret.is_none() {
            warn!(
                "🚨️🚨️🚨️ CSR_MP_WEBHOOK_SECRET is not set. Webhook signatures will NOT be checked and anyone can \
                 post payment notifications to this server. DO NOT run production like this. 🚨️🚨️🚨️"
            );
        }
        let event_buffer_size = env::var("CSR_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for CSR_EVENT_BUFFER_SIZE ({s}). {e}"))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        let mercadopago = MercadoPagoConfig::new_from_env_or_default();
        let mailer = MailerConfig::from_env();
        Self { host, port, database_url, webhook_secret, event_buffer_size, mercadopago, mailer }
    }
}

//-------------------------------------------------  MailerConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct MailerConfig {
    /// The endpoint that accepts `{from, to, subject, html}` JSON messages.
    pub api_url: String,
    pub api_key: Secret<String>,
    pub from: String,
}

impl MailerConfig {
    /// Returns `None` if confirmation emails are switched off or any of the mailer settings is missing.
    pub fn from_env() -> Option<Self> {
        if !parse_boolean_flag(env::var("CSR_SEND_CONFIRMATIONS").ok(), true) {
            info!("🪛️ CSR_SEND_CONFIRMATIONS is off. No order confirmation emails will be sent.");
            return None;
        }
        let api_url = env::var("CSR_EMAIL_API_URL").ok().filter(|s| !s.is_empty());
        let api_key = env::var("CSR_EMAIL_API_KEY").ok().filter(|s| !s.is_empty());
        let from = env::var("CSR_EMAIL_FROM").ok().filter(|s| !s.is_empty());
        match (api_url, api_key, from) {
            (Some(api_url), Some(api_key), Some(from)) => {
                info!("🪛️ Order confirmations will be sent from {from} via {api_url}");
                Some(Self { api_url, api_key: Secret::new(api_key), from })
            },
            _ => {
                warn!(
                    "🪛️ CSR_EMAIL_API_URL, CSR_EMAIL_API_KEY and CSR_EMAIL_FROM must all be set to send order \
                     confirmations. Confirmation emails are disabled."
                );
                None
            },
        }
    }
}
