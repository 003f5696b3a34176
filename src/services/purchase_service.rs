use crate::error::{Error, Result};
use crate::models::assessment_link::{AssessmentLink, LinkUsability};
use crate::models::link_purchase::{LinkPurchase, PurchaseStatus};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PurchaseService {
    pool: PgPool,
}

impl PurchaseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initiates a payment order for a paid link. The gateway redirect is
    /// out of scope; the record starts in `created` and waits for the
    /// webhook confirmation.
    pub async fn create_order(
        &self,
        link: &AssessmentLink,
        participant_email: &str,
        participant_name: Option<&str>,
    ) -> Result<LinkPurchase> {
        if !link.requires_payment() {
            return Err(Error::BadRequest(
                "This assessment link does not require payment".to_string(),
            ));
        }
        match link.usability(Utc::now()) {
            LinkUsability::Active => {}
            LinkUsability::Inactive => {
                return Err(Error::InvalidState(
                    "This assessment link is no longer active".to_string(),
                ))
            }
            LinkUsability::Expired => {
                return Err(Error::Expired(
                    "This assessment link has expired".to_string(),
                ))
            }
            LinkUsability::MaxReached => {
                return Err(Error::CapacityExceeded(
                    "This assessment link has reached its maximum number of attempts".to_string(),
                ))
            }
        }

        let order_id = format!("ord_{}", Uuid::new_v4().simple());

        let purchase = sqlx::query_as::<_, LinkPurchase>(
            r#"
            INSERT INTO link_purchases (
                link_token, link_id, participant_email, participant_name,
                amount, currency, status, order_id
            )
            VALUES ($1, $2, $3, $4, $5, 'USD', $6, $7)
            RETURNING *
            "#,
        )
        .bind(&link.token)
        .bind(link.id)
        .bind(participant_email)
        .bind(participant_name)
        .bind(link.price)
        .bind(PurchaseStatus::Created)
        .bind(&order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(purchase)
    }

    pub async fn find_by_order_id(&self, order_id: &str) -> Result<LinkPurchase> {
        sqlx::query_as::<_, LinkPurchase>("SELECT * FROM link_purchases WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Purchase order not found".to_string()))
    }

    /// Applies a gateway outcome to an order, enforcing the one-directional
    /// status machine. A refunded purchase never changes again.
    pub async fn apply_gateway_update(
        &self,
        order_id: &str,
        payment_id: Option<&str>,
        next: PurchaseStatus,
    ) -> Result<LinkPurchase> {
        let purchase = self.find_by_order_id(order_id).await?;

        if !purchase.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "Purchase in status '{}' cannot move to '{}'",
                status_label(purchase.status),
                status_label(next)
            )));
        }

        let updated = sqlx::query_as::<_, LinkPurchase>(
            r#"
            UPDATE link_purchases
            SET status = $1, payment_id = COALESCE($2, payment_id), updated_at = NOW()
            WHERE order_id = $3
            RETURNING *
            "#,
        )
        .bind(next)
        .bind(payment_id)
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }
}

fn status_label(status: PurchaseStatus) -> &'static str {
    match status {
        PurchaseStatus::Created => "created",
        PurchaseStatus::Paid => "paid",
        PurchaseStatus::Failed => "failed",
        PurchaseStatus::Refunded => "refunded",
    }
}
