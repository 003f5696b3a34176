use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEvent {
    pub fn new(
        user_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: impl ToString,
    ) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            details: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

/// Fire-and-forget dispatch onto the audit channel. Recording never blocks
/// the primary action and never surfaces a failure to it.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditHandle {
    pub fn record(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("audit writer has shut down; event dropped");
        }
    }
}

/// Spawns the background consumer that drains audit events into the store.
/// Insert failures are logged and swallowed.
pub fn spawn_audit_writer(pool: PgPool) -> AuditHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(err) = insert_event(&pool, &event).await {
                tracing::error!(error = ?err, action = %event.action, "failed to persist audit event");
            }
        }
    });
    AuditHandle { tx }
}

async fn insert_event(pool: &PgPool, event: &AuditEvent) -> crate::error::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.user_id)
    .bind(&event.action)
    .bind(&event.entity_type)
    .bind(&event.entity_id)
    .bind(&event.details)
    .bind(&event.ip_address)
    .bind(&event.user_agent)
    .execute(pool)
    .await?;
    Ok(())
}
