use crate::dto::response::{Page, Pagination};
use crate::error::Result;
use crate::models::assessment_link::AssessmentLink;
use crate::models::email_history::{EmailHistory, EMAIL_STATUS_FAILED, EMAIL_STATUS_SENT};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Outbound mail transport. Production posts to an HTTP mail API; tests
/// substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("mail API responded with {}", response.status());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RecipientOutcome {
    pub email: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkSendOutcome {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<RecipientOutcome>,
}

#[derive(Clone)]
pub struct EmailService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl EmailService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    /// Shares a link with a set of recipients. Outcomes are independent: a
    /// transport failure for one recipient is recorded and the fan-out
    /// continues; the caller always receives the full per-recipient
    /// breakdown.
    pub async fn send_link_bulk(
        &self,
        link: &AssessmentLink,
        test_title: &str,
        sent_by: Option<Uuid>,
        recipients: &[String],
        custom_message: Option<&str>,
    ) -> Result<BulkSendOutcome> {
        let config = crate::config::get_config();
        let url = format!("{}/assessment/{}", config.assessment_base_url, link.token);
        let subject = format!("You're invited to take the assessment: {}", test_title);
        let html = invitation_html(test_title, &url, custom_message);

        let mut outcome = BulkSendOutcome {
            successful: 0,
            failed: 0,
            results: Vec::with_capacity(recipients.len()),
        };

        for recipient in recipients {
            let send_result = self.mailer.send(recipient, &subject, &html).await;
            let (status, error) = match &send_result {
                Ok(()) => {
                    outcome.successful += 1;
                    (EMAIL_STATUS_SENT, None)
                }
                Err(err) => {
                    outcome.failed += 1;
                    tracing::warn!(recipient = %recipient, error = %err, "link email delivery failed");
                    (EMAIL_STATUS_FAILED, Some(err.to_string()))
                }
            };

            sqlx::query(
                r#"
                INSERT INTO email_history (
                    link_id, sent_by, recipient_email, subject, status,
                    error_message, custom_message, metadata
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(link.id)
            .bind(sent_by)
            .bind(recipient)
            .bind(&subject)
            .bind(status)
            .bind(&error)
            .bind(custom_message)
            .bind(json!({ "campaign": link.campaign_name }))
            .execute(&self.pool)
            .await?;

            outcome.results.push(RecipientOutcome {
                email: recipient.clone(),
                status: status.to_string(),
                error,
            });
        }

        Ok(outcome)
    }

    pub async fn list_history(
        &self,
        link_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<Page<EmailHistory>> {
        let offset = (page - 1) * limit;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM email_history WHERE ($1::uuid IS NULL OR link_id = $1)",
        )
        .bind(link_id)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, EmailHistory>(
            r#"
            SELECT * FROM email_history
            WHERE ($1::uuid IS NULL OR link_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(link_id)
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

fn invitation_html(test_title: &str, url: &str, custom_message: Option<&str>) -> String {
    let mut body = format!(
        "<p>You have been invited to take the assessment <strong>{}</strong>.</p>\
         <p><a href=\"{}\">Start the assessment</a></p>",
        test_title, url
    );
    if let Some(message) = custom_message {
        body.push_str(&format!("<p>{}</p>", message));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::link_dto::CreateLinkPayload;
    use crate::dto::test_dto::CreateTestPayload;
    use crate::services::link_service::LinkService;
    use crate::services::test_service::TestService;
    use dotenvy::dotenv;
    use sqlx::postgres::PgPoolOptions;
    use std::env;

    #[test]
    fn invitation_html_includes_custom_message() {
        let html = invitation_html("PHQ-9", "https://x/assessment/abc", Some("See you soon"));
        assert!(html.contains("PHQ-9"));
        assert!(html.contains("https://x/assessment/abc"));
        assert!(html.contains("See you soon"));
    }

    #[test]
    fn invitation_html_without_custom_message() {
        let html = invitation_html("PHQ-9", "https://x/assessment/abc", None);
        assert!(!html.contains("<p></p>"));
    }

    fn ensure_config() {
        env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
        env::set_var("JWT_SECRET", "test_secret_key");
        env::set_var("PAYMENT_WEBHOOK_SECRET", "whsec_test");
        env::set_var("MAIL_API_URL", "http://localhost/mail");
        env::set_var("MAIL_API_KEY", "mail_test");
        env::set_var("MAIL_FROM_ADDRESS", "noreply@example.com");
        env::set_var("ASSESSMENT_BASE_URL", "http://localhost:3000");
        env::set_var("ADMIN_RPS", "100");
        env::set_var("PUBLIC_RPS", "100");
        let _ = crate::config::init_config();
    }

    async fn setup_test_db() -> PgPool {
        dotenv().ok();
        ensure_config();
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to create test pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    async fn seed_link(pool: &PgPool) -> (Uuid, crate::models::assessment_link::AssessmentLink) {
        let admin_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, 'admin')")
            .bind(admin_id)
            .bind("Email Admin")
            .bind(format!("email_admin_{}@example.com", admin_id))
            .execute(pool)
            .await
            .expect("seed admin");

        let test = TestService::new(pool.clone())
            .create_test(
                CreateTestPayload {
                    title: "Wellbeing Check".into(),
                    description: None,
                    questions: Some(serde_json::json!([])),
                    eligibility: None,
                    is_active: Some(true),
                },
                admin_id,
            )
            .await
            .expect("create test");

        let link = LinkService::new(pool.clone())
            .create_link(
                CreateLinkPayload {
                    test_id: test.id,
                    campaign_name: Some("spring-campaign".into()),
                    expires_at: None,
                    max_attempts: None,
                    link_type: None,
                    price: None,
                },
                admin_id,
            )
            .await
            .expect("create link");

        (admin_id, link)
    }

    #[tokio::test]
    async fn bulk_send_records_independent_outcomes() {
        let pool = setup_test_db().await;
        let (admin_id, link) = seed_link(&pool).await;

        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .times(3)
            .returning(|to, _, _| {
                if to == "down@example.com" {
                    Err(anyhow::anyhow!("mail API responded with 503"))
                } else {
                    Ok(())
                }
            });

        let service = EmailService::new(pool.clone(), Arc::new(mailer));
        let recipients = vec![
            "a@example.com".to_string(),
            "down@example.com".to_string(),
            "b@example.com".to_string(),
        ];

        let outcome = service
            .send_link_bulk(&link, "Wellbeing Check", Some(admin_id), &recipients, None)
            .await
            .expect("bulk send");

        assert_eq!(outcome.successful, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.results.len(), 3);
        let failed = outcome
            .results
            .iter()
            .find(|r| r.email == "down@example.com")
            .unwrap();
        assert_eq!(failed.status, EMAIL_STATUS_FAILED);
        assert!(failed.error.is_some());

        let history = service
            .list_history(Some(link.id), 1, 10)
            .await
            .expect("history");
        assert_eq!(history.pagination.total, 3);
        let sent = history
            .items
            .iter()
            .filter(|h| h.status == EMAIL_STATUS_SENT)
            .count();
        assert_eq!(sent, 2);
    }
}
