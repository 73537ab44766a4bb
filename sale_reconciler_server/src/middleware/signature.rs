//! Webhook signature middleware for Actix Web.
//!
//! The payment processor signs each notification with the shared webhook secret (see [`crate::signature`]). The
//! manifest includes the payment id from the notification body, so the middleware has to buffer the body to find it.
//! The body is put back on the request afterwards so that the handler can read it as normal.
//!
//! Wrap the webhook routes with [`SignatureMiddlewareFactory`]. Requests that fail the check get a 401 and never reach
//! the handler.
use std::{
    collections::HashMap,
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use bytes::Bytes;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    errors::ServerError,
    signature::{SignatureVerifier, REQUEST_ID_HEADER, SIGNATURE_HEADER},
};

pub struct SignatureMiddlewareFactory {
    verifier: SignatureVerifier,
}

impl SignatureMiddlewareFactory {
    pub fn new(verifier: SignatureVerifier) -> Self {
        SignatureMiddlewareFactory { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService { verifier: self.verifier.clone(), service: Rc::new(service) }))
    }
}

pub struct SignatureMiddlewareService<S> {
    verifier: SignatureVerifier,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let verifier = self.verifier.clone();
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for request");
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ServerError::InvalidRequestBody(e.to_string())
            })?;
            let data_id = data_id_from_body(&data).or_else(|| data_id_from_query(req.query_string()));
            let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
            let request_id = req.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok());
            if verifier.verify(signature, request_id, data_id.as_deref()) {
                trace!("🔐️ Webhook signature check ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!(
                    "🔐️ Invalid webhook signature for payment {} (request id {}). Denying access.",
                    data_id.as_deref().unwrap_or("<none>"),
                    request_id.unwrap_or("<none>")
                );
                Err(ServerError::InvalidSignature.into())
            }
        })
    }
}

/// `data.id` from a JSON body. Numeric ids are converted to strings.
fn data_id_from_body(body: &[u8]) -> Option<String> {
    let value = serde_json::from_slice::<serde_json::Value>(body).ok()?;
    match value.pointer("/data/id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn data_id_from_query(query: &str) -> Option<String> {
    let params = web::Query::<HashMap<String, String>>::from_query(query).ok()?;
    params.get("data.id").cloned()
}

fn bytes_to_payload(buf: Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
