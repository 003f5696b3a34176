use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::dto::payment_dto::PaymentWebhookPayload;
use crate::dto::response::ApiResponse;
use crate::error::{Error, Result};
use crate::models::link_purchase::PurchaseStatus;
use crate::services::audit_service::AuditEvent;
use crate::AppState;

const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Gateway confirmation endpoint. The signature is an HMAC-SHA256 of the
/// raw request body, hex-encoded.
#[axum::debug_handler]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing webhook signature".to_string()))?;

    verify_signature(
        &crate::config::get_config().payment_webhook_secret,
        &body,
        signature,
    )?;

    let payload: PaymentWebhookPayload = serde_json::from_str(&body)?;
    let next = match payload.status.as_str() {
        "paid" => PurchaseStatus::Paid,
        "failed" => PurchaseStatus::Failed,
        "refunded" => PurchaseStatus::Refunded,
        other => {
            return Err(Error::BadRequest(format!(
                "Unknown payment status '{}'",
                other
            )))
        }
    };

    let purchase = state
        .purchase_service
        .apply_gateway_update(&payload.order_id, payload.payment_id.as_deref(), next)
        .await?;

    state.audit.record(
        AuditEvent::new(None, "payment_webhook", "link_purchase", purchase.id)
            .with_details(json!({ "event": payload.event, "order_id": payload.order_id })),
    );

    Ok(ApiResponse::ok(
        "Purchase updated",
        json!({ "orderId": purchase.order_id, "status": purchase.status }),
    ))
}

fn verify_signature(secret: &str, body: &str, signature_hex: &str) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::Internal("Webhook secret is unusable".to_string()))?;
    mac.update(body.as_bytes());
    let expected = mac.finalize().into_bytes();

    let provided = hex::decode(signature_hex)
        .map_err(|_| Error::Unauthorized("Malformed webhook signature".to_string()))?;

    if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        Err(Error::Unauthorized(
            "Invalid webhook signature".to_string(),
        ))
    }
}
