use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::string_or_number;

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
/// The status of a payment as reported by the processor.
///
/// Unknown values are preserved in [`PaymentStatus::Other`] so that a new status on the processor side never causes a
/// notification to be dropped as unparseable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Authorized,
    InProcess,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::InProcess => "in_process",
            PaymentStatus::InMediation => "in_mediation",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::ChargedBack => "charged_back",
            PaymentStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "authorized" => Self::Authorized,
            "in_process" => Self::InProcess,
            "in_mediation" => Self::InMediation,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "charged_back" => Self::ChargedBack,
            _ => Self::Other(value),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(value: PaymentStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------        Payer        ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

//--------------------------------------     PaymentInfo     ---------------------------------------------------------
/// The subset of the processor's payment resource that the reconciler uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub transaction_amount: f64,
    #[serde(default)]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_approved: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payer: Option<Payer>,
    /// The merchant's own reference. The checkout flow sets this to the order id.
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub payment_type_id: Option<String>,
}

impl PaymentInfo {
    pub fn payer_email(&self) -> Option<&str> {
        self.payer.as_ref().and_then(|p| p.email.as_deref()).filter(|e| !e.trim().is_empty())
    }

    /// The external reference, ignoring blank values.
    pub fn order_reference(&self) -> Option<&str> {
        self.external_reference.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const APPROVED_PAYMENT: &str = r#"{
        "id": 123456789,
        "status": "approved",
        "status_detail": "accredited",
        "transaction_amount": 100.0,
        "currency_id": "BRL",
        "date_created": "2024-05-02T10:15:00.000-04:00",
        "date_approved": "2024-05-02T10:15:03.000-04:00",
        "payer": { "email": "ana@example.com", "first_name": null },
        "external_reference": "o1",
        "payment_method_id": "pix",
        "payment_type_id": "bank_transfer",
        "collector_id": 99
    }"#;

    #[test]
    fn deserialize_payment() {
        let payment: PaymentInfo = serde_json::from_str(APPROVED_PAYMENT).unwrap();
        assert_eq!(payment.id, "123456789");
        assert_eq!(payment.status, PaymentStatus::Approved);
        assert_eq!(payment.payer_email(), Some("ana@example.com"));
        assert_eq!(payment.order_reference(), Some("o1"));
        assert_eq!(payment.date_approved.unwrap().to_rfc3339(), "2024-05-02T14:15:03+00:00");
    }

    #[test]
    fn sparse_payment() {
        let payment: PaymentInfo =
            serde_json::from_str(r#"{"id": 1, "status": "in_mediation", "external_reference": "  "}"#).unwrap();
        assert_eq!(payment.id, "1");
        assert_eq!(payment.status, PaymentStatus::InMediation);
        assert_eq!(payment.order_reference(), None);
        assert_eq!(payment.payer_email(), None);
        assert_eq!(payment.transaction_amount, 0.0);
    }

    #[test]
    fn string_payment_ids() {
        let payment: PaymentInfo =
            serde_json::from_str(r#"{"id": "pay123", "status": "approved", "external_reference": "o1"}"#).unwrap();
        assert_eq!(payment.id, "pay123");
        assert_eq!(payment.status, PaymentStatus::Approved);
    }

    #[test]
    fn unknown_statuses_are_preserved() {
        let status: PaymentStatus = serde_json::from_str(r#""partially_refunded""#).unwrap();
        assert_eq!(status, PaymentStatus::Other("partially_refunded".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""partially_refunded""#);
        assert_eq!(PaymentStatus::from("charged_back".to_string()), PaymentStatus::ChargedBack);
    }
}
