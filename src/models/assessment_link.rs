use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "link_type", rename_all = "lowercase")]
pub enum LinkType {
    Free,
    Paid,
}

/// Derived usability of a link at a point in time. Never stored; computed
/// from the persisted flags and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkUsability {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "max-reached")]
    MaxReached,
    #[serde(rename = "inactive")]
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentLink {
    pub id: Uuid,
    pub token: String,
    pub test_id: Uuid,
    pub created_by: Option<Uuid>,
    pub campaign_name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_attempts: Option<i32>,
    pub current_attempts: i32,
    pub is_active: bool,
    pub link_type: LinkType,
    pub price: Decimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssessmentLink {
    /// Inactive takes precedence over expired, expired over max-reached.
    pub fn usability(&self, now: DateTime<Utc>) -> LinkUsability {
        if !self.is_active {
            return LinkUsability::Inactive;
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at <= now {
                return LinkUsability::Expired;
            }
        }
        if let Some(max) = self.max_attempts {
            if self.current_attempts >= max {
                return LinkUsability::MaxReached;
            }
        }
        LinkUsability::Active
    }

    pub fn requires_payment(&self) -> bool {
        self.link_type == LinkType::Paid && self.price > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link() -> AssessmentLink {
        AssessmentLink {
            id: Uuid::new_v4(),
            token: "a".repeat(64),
            test_id: Uuid::new_v4(),
            created_by: None,
            campaign_name: None,
            expires_at: None,
            max_attempts: None,
            current_attempts: 0,
            is_active: true,
            link_type: LinkType::Free,
            price: Decimal::ZERO,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn fresh_link_is_active() {
        assert_eq!(link().usability(Utc::now()), LinkUsability::Active);
    }

    #[test]
    fn inactive_wins_over_everything() {
        let mut l = link();
        l.is_active = false;
        l.expires_at = Some(Utc::now() - Duration::hours(1));
        l.max_attempts = Some(1);
        l.current_attempts = 1;
        assert_eq!(l.usability(Utc::now()), LinkUsability::Inactive);
    }

    #[test]
    fn expired_wins_over_max_reached() {
        let mut l = link();
        l.expires_at = Some(Utc::now() - Duration::seconds(1));
        l.max_attempts = Some(1);
        l.current_attempts = 1;
        assert_eq!(l.usability(Utc::now()), LinkUsability::Expired);
    }

    #[test]
    fn cap_reached_reports_max_reached() {
        let mut l = link();
        l.max_attempts = Some(3);
        l.current_attempts = 3;
        assert_eq!(l.usability(Utc::now()), LinkUsability::MaxReached);
    }

    #[test]
    fn paid_link_with_zero_price_needs_no_payment() {
        let mut l = link();
        l.link_type = LinkType::Paid;
        assert!(!l.requires_payment());
        l.price = Decimal::new(100, 0);
        assert!(l.requires_payment());
    }
}
