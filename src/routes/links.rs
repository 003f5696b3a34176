use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::dto::link_dto::{
    page_params, CreateLinkPayload, ListLinksQuery, PageQuery, SendLinkEmailPayload,
};
use crate::dto::response::ApiResponse;
use crate::dto::test_dto::CreateTestPayload;
use crate::error::{Error, Result};
use crate::middleware::auth::AdminContext;
use crate::services::audit_service::AuditEvent;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_links(
    State(state): State<AppState>,
    Query(query): Query<ListLinksQuery>,
) -> Result<impl IntoResponse> {
    let is_active = query.active_filter()?;
    let (page, limit) = page_params(query.page, query.limit);
    let result = state.link_service.list_links(is_active, page, limit).await?;
    Ok(ApiResponse::ok("Assessment links retrieved", result))
}

#[axum::debug_handler]
pub async fn create_link(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    axum::Json(payload): axum::Json<CreateLinkPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let link = state.link_service.create_link(payload, admin.user_id).await?;

    state.audit.record(
        AuditEvent::new(Some(admin.user_id), "create_link", "assessment_link", link.id)
            .with_details(json!({ "token": link.token, "test_id": link.test_id })),
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Assessment link created", link),
    ))
}

#[axum::debug_handler]
pub async fn deactivate_link(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(link_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let link = state.link_service.deactivate(link_id).await?;

    state.audit.record(AuditEvent::new(
        Some(admin.user_id),
        "deactivate_link",
        "assessment_link",
        link.id,
    ));

    Ok(ApiResponse::ok("Assessment link deactivated", link))
}

#[axum::debug_handler]
pub async fn link_results(
    State(state): State<AppState>,
    Path(link_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let link = state.link_service.find_by_id(link_id).await?;
    let (page, limit) = page_params(query.page, query.limit);
    let results = state
        .attempt_service
        .list_results(&link.token, page, limit)
        .await?;
    Ok(ApiResponse::ok("Link results retrieved", results))
}

#[axum::debug_handler]
pub async fn link_email_history(
    State(state): State<AppState>,
    Path(link_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let link = state.link_service.find_by_id(link_id).await?;
    let (page, limit) = page_params(query.page, query.limit);
    let history = state
        .email_service
        .list_history(Some(link.id), page, limit)
        .await?;
    Ok(ApiResponse::ok("Email history retrieved", history))
}

#[axum::debug_handler]
pub async fn all_email_history(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let (page, limit) = page_params(query.page, query.limit);
    let history = state.email_service.list_history(None, page, limit).await?;
    Ok(ApiResponse::ok("Email history retrieved", history))
}

#[axum::debug_handler]
pub async fn send_link_email(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(link_id): Path<Uuid>,
    axum::Json(payload): axum::Json<SendLinkEmailPayload>,
) -> Result<impl IntoResponse> {
    let recipients = payload.recipient_emails.into_vec();
    if recipients.is_empty() {
        return Err(Error::BadRequest(
            "At least one recipient email is required".to_string(),
        ));
    }
    for email in &recipients {
        if !email.validate_email() {
            return Err(Error::BadRequest(format!(
                "Invalid recipient email: {}",
                email
            )));
        }
    }

    let link = state.link_service.find_by_id(link_id).await?;
    let test = state.test_service.get_test(link.test_id).await?;

    let outcome = state
        .email_service
        .send_link_bulk(
            &link,
            &test.title,
            Some(admin.user_id),
            &recipients,
            payload.custom_message.as_deref(),
        )
        .await?;

    state.audit.record(
        AuditEvent::new(Some(admin.user_id), "send_link_email", "assessment_link", link.id)
            .with_details(json!({
                "recipients": recipients.len(),
                "successful": outcome.successful,
                "failed": outcome.failed,
            })),
    );

    // Per-recipient failures are data, not an error; the endpoint always
    // answers 200 with the breakdown.
    Ok(ApiResponse::ok("Link emails processed", outcome))
}

#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    axum::Json(payload): axum::Json<CreateTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let test = state.test_service.create_test(payload, admin.user_id).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Test created", test)))
}

#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test(test_id).await?;
    Ok(ApiResponse::ok("Test retrieved", test))
}
