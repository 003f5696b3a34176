use crate::dto::public_dto::ParticipantInfoPayload;
use crate::dto::response::{Page, Pagination};
use crate::error::{Error, Result};
use crate::models::assessment_link::AssessmentLink;
use crate::models::attempt::{Attempt, ATTEMPT_STATUS_IN_PROGRESS, ATTEMPT_STATUS_SUBMITTED};
use crate::models::link_purchase::{LinkPurchase, PurchaseStatus};
use crate::models::test::Test;
use crate::models::user::User;
use crate::services::eligibility;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Redeems a link and issues an attempt. The gating order is fixed:
    /// lookup, active flag, expiry, capacity, eligibility, payment, then
    /// attempt creation plus counter increment as one transaction. The
    /// increment is conditional on the cap, so two racing redemptions
    /// cannot push `current_attempts` past `max_attempts`.
    pub async fn start(
        &self,
        token: &str,
        info: Option<&ParticipantInfoPayload>,
        user: Option<&User>,
    ) -> Result<(Attempt, Test)> {
        let link = sqlx::query_as::<_, AssessmentLink>(
            "SELECT * FROM assessment_links WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment link not found".to_string()))?;

        if !link.is_active {
            return Err(Error::InvalidState(
                "This assessment link is no longer active".to_string(),
            ));
        }

        let now = Utc::now();
        if let Some(expires_at) = link.expires_at {
            if expires_at <= now {
                return Err(Error::Expired(
                    "This assessment link has expired".to_string(),
                ));
            }
        }

        if let Some(max) = link.max_attempts {
            if link.current_attempts >= max {
                return Err(Error::CapacityExceeded(
                    "This assessment link has reached its maximum number of attempts".to_string(),
                ));
            }
        }

        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(link.test_id)
            .fetch_one(&self.pool)
            .await?;

        let rules = eligibility::parse_rules(test.eligibility.as_ref())?;
        let submitted_dob = info.and_then(|i| i.date_of_birth.as_deref());
        let profile_dob = user.and_then(|u| u.date_of_birth);
        let dob = eligibility::resolve_date_of_birth(submitted_dob, profile_dob);
        eligibility::check(&rules, dob, now.date_naive()).map_err(Error::Ineligible)?;

        if link.requires_payment() {
            let email = info
                .and_then(|i| i.email.as_deref())
                .or(user.map(|u| u.email.as_str()))
                .ok_or_else(|| {
                    Error::BadRequest(
                        "A participant email is required to redeem a paid link".to_string(),
                    )
                })?;
            let paid = sqlx::query_as::<_, LinkPurchase>(
                r#"
                SELECT * FROM link_purchases
                WHERE link_token = $1 AND participant_email = $2 AND status = $3
                LIMIT 1
                "#,
            )
            .bind(token)
            .bind(email)
            .bind(PurchaseStatus::Paid)
            .fetch_optional(&self.pool)
            .await?;
            if paid.is_none() {
                return Err(Error::PaymentRequired(
                    "This assessment link requires payment before starting".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            INSERT INTO attempts (
                link_token, test_id, user_id, participant_name, participant_email,
                participant_gender, participant_date_of_birth, status, started_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(link.test_id)
        .bind(user.map(|u| u.id))
        .bind(info.and_then(|i| i.name.as_deref()))
        .bind(info.and_then(|i| i.email.as_deref()))
        .bind(info.and_then(|i| i.gender.as_deref()))
        .bind(dob)
        .bind(ATTEMPT_STATUS_IN_PROGRESS)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // Capacity check and increment as one indivisible statement; losing
        // the race aborts the whole transaction, attempt row included.
        let reserved = sqlx::query(
            r#"
            UPDATE assessment_links
            SET current_attempts = current_attempts + 1, updated_at = NOW()
            WHERE token = $1
              AND (max_attempts IS NULL OR current_attempts < max_attempts)
            "#,
        )
        .bind(token)
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            return Err(Error::CapacityExceeded(
                "This assessment link has reached its maximum number of attempts".to_string(),
            ));
        }

        tx.commit().await?;

        Ok((attempt, test))
    }

    async fn find_for_link(&self, token: &str, attempt_id: Uuid) -> Result<Attempt> {
        sqlx::query_as::<_, Attempt>(
            "SELECT * FROM attempts WHERE id = $1 AND link_token = $2",
        )
        .bind(attempt_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Attempt not found for this link".to_string()))
    }

    /// Merges the submitted keys into the attempt's answers map.
    pub async fn save_answers(
        &self,
        token: &str,
        attempt_id: Uuid,
        answers: JsonValue,
    ) -> Result<Attempt> {
        let answers_obj = answers
            .as_object()
            .ok_or_else(|| Error::BadRequest("Answers must be an object".to_string()))?
            .clone();

        let attempt = self.find_for_link(token, attempt_id).await?;
        if attempt.status == ATTEMPT_STATUS_SUBMITTED {
            return Err(Error::InvalidState(
                "This attempt has already been submitted".to_string(),
            ));
        }

        let mut merged = attempt
            .answers
            .as_ref()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        for (key, value) in answers_obj {
            merged.insert(key, value);
        }

        let updated = sqlx::query_as::<_, Attempt>(
            r#"
            UPDATE attempts
            SET answers = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(JsonValue::Object(merged))
        .bind(attempt.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn submit(&self, token: &str, attempt_id: Uuid) -> Result<Attempt> {
        let attempt = self.find_for_link(token, attempt_id).await?;
        if attempt.status == ATTEMPT_STATUS_SUBMITTED {
            return Err(Error::InvalidState(
                "This attempt has already been submitted".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Attempt>(
            r#"
            UPDATE attempts
            SET status = $1, submitted_at = NOW(), updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(ATTEMPT_STATUS_SUBMITTED)
        .bind(attempt.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Results for a link are its attempts, newest first.
    pub async fn list_results(
        &self,
        link_token: &str,
        page: i64,
        limit: i64,
    ) -> Result<Page<Attempt>> {
        let offset = (page - 1) * limit;

        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attempts WHERE link_token = $1")
                .bind(link_token)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM attempts
            WHERE link_token = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(link_token)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }
}
