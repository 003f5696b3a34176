use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub link_token: Option<String>,
    pub test_id: Uuid,
    pub user_id: Option<Uuid>,
    pub participant_name: Option<String>,
    pub participant_email: Option<String>,
    pub participant_gender: Option<String>,
    pub participant_date_of_birth: Option<NaiveDate>,
    pub answers: Option<JsonValue>,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub const ATTEMPT_STATUS_IN_PROGRESS: &str = "in_progress";
pub const ATTEMPT_STATUS_SUBMITTED: &str = "submitted";
