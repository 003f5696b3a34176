use crate::models::assessment_link::{LinkType, LinkUsability};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfoPayload {
    pub name: Option<String>,
    #[validate(email(message = "Invalid participant email"))]
    pub email: Option<String>,
    /// ISO date, `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    #[validate(nested)]
    pub participant_info: Option<ParticipantInfoPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLinkResponse {
    pub status: LinkUsability,
    pub test_title: String,
    pub link_type: LinkType,
    pub price: Decimal,
    pub campaign_name: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: uuid::Uuid,
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub questions: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct SaveAnswersRequest {
    pub answers: JsonValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptResponse {
    pub attempt_id: uuid::Uuid,
    pub status: String,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(email(message = "Invalid participant email"))]
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: crate::models::link_purchase::PurchaseStatus,
}
