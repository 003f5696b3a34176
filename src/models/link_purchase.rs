use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "purchase_status", rename_all = "lowercase")]
pub enum PurchaseStatus {
    Created,
    Paid,
    Failed,
    Refunded,
}

impl PurchaseStatus {
    /// Transitions are one-directional; only `paid` may move on to
    /// `refunded`, and `refunded` is terminal.
    pub fn can_transition_to(self, next: PurchaseStatus) -> bool {
        matches!(
            (self, next),
            (PurchaseStatus::Created, PurchaseStatus::Paid)
                | (PurchaseStatus::Created, PurchaseStatus::Failed)
                | (PurchaseStatus::Paid, PurchaseStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LinkPurchase {
    pub id: Uuid,
    pub link_token: String,
    pub link_id: Uuid,
    pub participant_email: String,
    pub participant_name: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PurchaseStatus,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        assert!(PurchaseStatus::Created.can_transition_to(PurchaseStatus::Paid));
        assert!(PurchaseStatus::Created.can_transition_to(PurchaseStatus::Failed));
        assert!(PurchaseStatus::Paid.can_transition_to(PurchaseStatus::Refunded));
    }

    #[test]
    fn refunded_is_terminal() {
        for next in [
            PurchaseStatus::Created,
            PurchaseStatus::Paid,
            PurchaseStatus::Failed,
            PurchaseStatus::Refunded,
        ] {
            assert!(!PurchaseStatus::Refunded.can_transition_to(next));
        }
    }

    #[test]
    fn no_backward_transitions() {
        assert!(!PurchaseStatus::Paid.can_transition_to(PurchaseStatus::Created));
        assert!(!PurchaseStatus::Failed.can_transition_to(PurchaseStatus::Paid));
        assert!(!PurchaseStatus::Failed.can_transition_to(PurchaseStatus::Created));
    }
}
