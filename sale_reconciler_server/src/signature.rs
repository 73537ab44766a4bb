//! Webhook signature verification.
//!
//! The processor signs every notification with the secret shared with the merchant. The signature header has the form
//! `ts=<timestamp>,v1=<hex digest>`, where the digest is the HMAC-SHA256 of the manifest
//! `{request-id}|{data-id}|{timestamp}` keyed with the shared secret.
//!
//! Any malformed input yields a "not authentic" verdict. Nothing in here returns an error.
use csr_common::Secret;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParts {
    pub timestamp: String,
    pub digest: String,
}

/// Splits a `ts=..,v1=..` header into its parts. The parts may come in any order and surrounding whitespace is
/// ignored. Unknown keys are skipped. Returns `None` if either part is missing or the timestamp is not an integer.
pub fn parse_signature_header(header: &str) -> Option<SignatureParts> {
    let mut timestamp = None;
    let mut digest = None;
    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ts" => timestamp = Some(value.trim()),
            "v1" => digest = Some(value.trim()),
            _ => {},
        }
    }
    let timestamp = timestamp.filter(|ts| ts.parse::<i64>().is_ok())?;
    let digest = digest.filter(|d| !d.is_empty())?;
    Some(SignatureParts { timestamp: timestamp.to_string(), digest: digest.to_string() })
}

pub fn signature_manifest(request_id: &str, data_id: &str, timestamp: &str) -> String {
    format!("{request_id}|{data_id}|{timestamp}")
}

/// Produces a complete signature header for the given notification. This is what the processor does on its side.
pub fn sign_notification(secret: &str, request_id: &str, data_id: &str, timestamp: i64) -> Option<String> {
    let manifest = signature_manifest(request_id, data_id, &timestamp.to_string());
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(manifest.as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    Some(format!("ts={timestamp},v1={digest}"))
}

#[derive(Clone, Debug, Default)]
pub struct SignatureVerifier {
    secret: Option<Secret<String>>,
}

impl SignatureVerifier {
    /// An empty secret counts as no secret.
    pub fn new(secret: Option<Secret<String>>) -> Self {
        let secret = secret.filter(|s| !s.reveal().is_empty());
        Self { secret }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Returns true if the signature header carries a valid digest for this request and payment id.
    ///
    /// With no secret configured, every request is authentic. That is logged at warn level on every call.
    pub fn verify(&self, signature_header: Option<&str>, request_id: Option<&str>, data_id: Option<&str>) -> bool {
        let Some(secret) = &self.secret else {
            warn!("🔐️ No webhook secret is configured. Accepting notification WITHOUT checking its signature.");
            return true;
        };
        let Some(parts) = signature_header.and_then(parse_signature_header) else {
            debug!("🔐️ Signature header is missing or malformed");
            return false;
        };
        let (Some(request_id), Some(data_id)) = (request_id, data_id) else {
            debug!("🔐️ Request id or payment data id is missing");
            return false;
        };
        let Ok(expected) = hex::decode(&parts.digest) else {
            debug!("🔐️ Signature digest is not valid hex");
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.reveal().as_bytes()) else {
            return false;
        };
        mac.update(signature_manifest(request_id, data_id, &parts.timestamp).as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}
