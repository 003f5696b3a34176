use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One row per recipient per send action; append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailHistory {
    pub id: Uuid,
    pub link_id: Uuid,
    pub sent_by: Option<Uuid>,
    pub recipient_email: String,
    pub subject: String,
    pub status: String,
    pub error_message: Option<String>,
    pub custom_message: Option<String>,
    pub metadata: Option<JsonValue>,
    pub created_at: Option<DateTime<Utc>>,
}

pub const EMAIL_STATUS_SENT: &str = "sent";
pub const EMAIL_STATUS_FAILED: &str = "failed";
