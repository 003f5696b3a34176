use crate::error::{Error, Result};
use crate::models::assessment_link::LinkType;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkPayload {
    pub test_id: Uuid,
    #[validate(length(min = 1, message = "Campaign name must not be empty"))]
    pub campaign_name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "maxAttempts must be at least 1"))]
    pub max_attempts: Option<i32>,
    pub link_type: Option<LinkType>,
    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ListLinksQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "isActive")]
    pub is_active: Option<String>,
}

impl ListLinksQuery {
    /// `isActive` defaults to active-only; `all` removes the filter.
    pub fn active_filter(&self) -> Result<Option<bool>> {
        match self.is_active.as_deref() {
            None | Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some("all") => Ok(None),
            Some(other) => Err(Error::BadRequest(format!(
                "isActive must be 'true', 'false' or 'all', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub fn page_params(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    (page.unwrap_or(1).max(1), limit.unwrap_or(10).clamp(1, 100))
}

/// `recipientEmails` accepts a single address or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipientEmails {
    One(String),
    Many(Vec<String>),
}

impl RecipientEmails {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RecipientEmails::One(email) => vec![email],
            RecipientEmails::Many(emails) => emails,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLinkEmailPayload {
    pub recipient_emails: RecipientEmails,
    pub custom_message: Option<String>,
}
