use serde::Deserialize;

/// Gateway confirmation payload, HMAC-signed over the raw body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookPayload {
    pub event: String,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub status: String,
}
