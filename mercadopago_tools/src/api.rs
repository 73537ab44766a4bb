use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
    Url,
};
use serde::de::DeserializeOwned;

use crate::{config::MercadoPagoConfig, data_objects::PaymentInfo, MercadoPagoApiError};

#[derive(Clone)]
pub struct MercadoPagoApi {
    base_url: Url,
    client: Arc<Client>,
}

impl MercadoPagoApi {
    pub fn new(config: MercadoPagoConfig) -> Result<Self, MercadoPagoApiError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| MercadoPagoApiError::Initialization(format!("Invalid API URL '{}'. {e}", config.api_url)))?;
        if base_url.cannot_be_a_base() {
            let msg = format!("'{}' cannot be used as a base URL", config.api_url);
            return Err(MercadoPagoApiError::Initialization(msg));
        }
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.access_token.reveal());
        let mut val =
            HeaderValue::from_str(&bearer).map_err(|e| MercadoPagoApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MercadoPagoApiError::Initialization(e.to_string()))?;
        Ok(Self { base_url, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<T, MercadoPagoApiError> {
        let url = self.url(segments);
        trace!("Sending REST query: {url}");
        let response = self.client.request(method, url).send().await?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| MercadoPagoApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(MercadoPagoApiError::QueryError { status, message })
        }
    }

    /// Appends `segments` to the base URL. Each segment is percent-encoded, so an id can never change the path.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects URLs that cannot be a base, so the path is always segmentable
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Fetches the full payment record for `payment_id`. This is the authoritative source for the payment status.
    pub async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentInfo, MercadoPagoApiError> {
        debug!("Fetching payment {payment_id}");
        let payment = self.rest_query::<PaymentInfo>(Method::GET, &["v1", "payments", payment_id]).await?;
        info!("Fetched payment {payment_id}. Status: {}", payment.status);
        Ok(payment)
    }
}
