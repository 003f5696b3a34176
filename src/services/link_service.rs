use crate::dto::link_dto::CreateLinkPayload;
use crate::dto::response::{Page, Pagination};
use crate::error::{Error, Result};
use crate::models::assessment_link::{AssessmentLink, LinkType, LinkUsability};
use crate::models::test::Test;
use crate::utils::token::generate_link_token;
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// At 256 bits of token entropy a collision only happens when the store
/// lookup itself is lying; the bound exists to fail loudly instead of
/// spinning.
const MAX_TOKEN_ATTEMPTS: u32 = 16;

#[derive(Clone)]
pub struct LinkService {
    pool: PgPool,
}

impl LinkService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_link(
        &self,
        payload: CreateLinkPayload,
        created_by: Uuid,
    ) -> Result<AssessmentLink> {
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(payload.test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;

        if !test.is_active {
            return Err(Error::InvalidState(
                "Cannot create a link for an inactive test".to_string(),
            ));
        }

        let link_type = payload.link_type.unwrap_or(LinkType::Free);
        let price = match payload.price {
            Some(raw) => Decimal::from_f64(raw)
                .filter(|p| !p.is_sign_negative())
                .ok_or_else(|| Error::BadRequest("Price must be a non-negative number".to_string()))?,
            None => Decimal::ZERO,
        };
        if link_type == LinkType::Paid && price <= Decimal::ZERO {
            return Err(Error::BadRequest(
                "A paid link requires a positive price".to_string(),
            ));
        }

        let token = self.generate_unique_token().await?;

        let link = sqlx::query_as::<_, AssessmentLink>(
            r#"
            INSERT INTO assessment_links (
                token, test_id, created_by, campaign_name, expires_at,
                max_attempts, current_attempts, is_active, link_type, price
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, TRUE, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&token)
        .bind(test.id)
        .bind(created_by)
        .bind(&payload.campaign_name)
        .bind(payload.expires_at)
        .bind(payload.max_attempts)
        .bind(link_type)
        .bind(price)
        .fetch_one(&self.pool)
        .await?;

        Ok(link)
    }

    /// Collision-checked token generation: a candidate is only accepted once
    /// the store confirms it is unseen. A store failure propagates — never
    /// accept an unverified token.
    async fn generate_unique_token(&self) -> Result<String> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let candidate = generate_link_token();
            let existing = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM assessment_links WHERE token = $1",
            )
            .bind(&candidate)
            .fetch_optional(&self.pool)
            .await?;
            if existing.is_none() {
                return Ok(candidate);
            }
            tracing::warn!("link token collision, generating a fresh candidate");
        }
        Err(Error::Internal(
            "Could not generate a unique link token".to_string(),
        ))
    }

    pub async fn list_links(
        &self,
        is_active: Option<bool>,
        page: i64,
        limit: i64,
    ) -> Result<Page<AssessmentLink>> {
        let offset = (page - 1) * limit;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM assessment_links WHERE ($1::bool IS NULL OR is_active = $1)",
        )
        .bind(is_active)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, AssessmentLink>(
            r#"
            SELECT * FROM assessment_links
            WHERE ($1::bool IS NULL OR is_active = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn find_by_token(&self, token: &str) -> Result<AssessmentLink> {
        sqlx::query_as::<_, AssessmentLink>("SELECT * FROM assessment_links WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Assessment link not found".to_string()))
    }

    pub async fn find_by_id(&self, link_id: Uuid) -> Result<AssessmentLink> {
        sqlx::query_as::<_, AssessmentLink>("SELECT * FROM assessment_links WHERE id = $1")
            .bind(link_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Assessment link not found".to_string()))
    }

    /// Public-facing read: derives usability without mutating anything.
    pub async fn validate(&self, token: &str) -> Result<(AssessmentLink, Test, LinkUsability)> {
        let link = self.find_by_token(token).await?;
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(link.test_id)
            .fetch_one(&self.pool)
            .await?;
        let usability = link.usability(Utc::now());
        Ok((link, test, usability))
    }

    /// Links are never hard-deleted; deactivation is the deletion substitute.
    pub async fn deactivate(&self, link_id: Uuid) -> Result<AssessmentLink> {
        sqlx::query_as::<_, AssessmentLink>(
            r#"
            UPDATE assessment_links
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment link not found".to_string()))
    }
}
