use crate::services::eligibility::EligibilityRule;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestPayload {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub questions: Option<JsonValue>,
    pub eligibility: Option<Vec<EligibilityRule>>,
    pub is_active: Option<bool>,
}
