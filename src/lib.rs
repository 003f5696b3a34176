pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::audit_service::AuditHandle;
use crate::services::{
    attempt_service::AttemptService,
    email_service::{EmailService, HttpMailer, Mailer},
    link_service::LinkService,
    purchase_service::PurchaseService,
    test_service::TestService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub link_service: LinkService,
    pub test_service: TestService,
    pub attempt_service: AttemptService,
    pub purchase_service: PurchaseService,
    pub email_service: EmailService,
    pub audit: AuditHandle,
}

impl AppState {
    pub fn new(pool: PgPool, audit: AuditHandle) -> Self {
        let config = crate::config::get_config();
        let mailer = Arc::new(HttpMailer::new(
            config.mail_api_url.clone(),
            config.mail_api_key.clone(),
            config.mail_from_address.clone(),
        ));
        Self::with_mailer(pool, audit, mailer)
    }

    pub fn with_mailer(pool: PgPool, audit: AuditHandle, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            link_service: LinkService::new(pool.clone()),
            test_service: TestService::new(pool.clone()),
            attempt_service: AttemptService::new(pool.clone()),
            purchase_service: PurchaseService::new(pool.clone()),
            email_service: EmailService::new(pool.clone(), mailer),
            audit,
            pool,
        }
    }
}
