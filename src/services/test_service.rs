use crate::dto::test_dto::CreateTestPayload;
use crate::error::{Error, Result};
use crate::models::test::Test;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(&self, payload: CreateTestPayload, created_by: Uuid) -> Result<Test> {
        let questions = payload.questions.unwrap_or_else(|| serde_json::json!([]));
        let eligibility = match payload.eligibility {
            Some(rules) => Some(serde_json::to_value(rules)?),
            None => None,
        };

        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests (title, description, questions, eligibility, is_active, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(questions)
        .bind(eligibility)
        .bind(payload.is_active.unwrap_or(true))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(test)
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<Test> {
        sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))
    }
}
