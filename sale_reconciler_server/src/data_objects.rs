use std::fmt::Display;

use mercadopago_tools::ids::{optional_string_or_number, string_or_number};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The body of a webhook notification from the payment processor.
///
/// Only `type` and `data.id` drive processing. The notification never carries the payment status; that is always
/// fetched from the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(default)]
    pub action: Option<String>,
    pub data: NotificationData,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub live_mode: bool,
}

impl PaymentNotification {
    pub fn is_payment(&self) -> bool {
        self.notification_type == "payment"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}
