use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::public_dto::{
    CreateOrderPayload, CreateOrderResponse, SaveAnswersRequest, StartAttemptRequest,
    StartAttemptResponse, SubmitAttemptResponse, ValidateLinkResponse,
};
use crate::dto::response::ApiResponse;
use crate::models::assessment_link::LinkUsability;
use crate::services::audit_service::AuditEvent;
use crate::AppState;

#[axum::debug_handler]
pub async fn validate_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<impl IntoResponse> {
    let (link, test, usability) = state.link_service.validate(&token).await?;

    let message = match usability {
        LinkUsability::Active => "Assessment link is active",
        LinkUsability::Expired => "Assessment link has expired",
        LinkUsability::MaxReached => "Assessment link has reached its attempt limit",
        LinkUsability::Inactive => "Assessment link is inactive",
    };

    Ok(ApiResponse::ok(
        message,
        ValidateLinkResponse {
            status: usability,
            test_title: test.title,
            link_type: link.link_type,
            price: link.price,
            campaign_name: link.campaign_name,
            expires_at: link.expires_at,
        },
    ))
}

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Option<Json<StartAttemptRequest>>,
) -> crate::error::Result<impl IntoResponse> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;

    let (attempt, test) = state
        .attempt_service
        .start(&token, request.participant_info.as_ref(), None)
        .await?;

    state.audit.record(
        AuditEvent::new(None, "start_attempt", "attempt", attempt.id)
            .with_details(json!({ "link_token": token })),
    );

    Ok(ApiResponse::ok(
        "Attempt issued",
        StartAttemptResponse {
            attempt_id: attempt.id,
            status: attempt.status,
            started_at: attempt.started_at,
            questions: test.questions,
        },
    ))
}

#[axum::debug_handler]
pub async fn save_answers(
    State(state): State<AppState>,
    Path((token, attempt_id)): Path<(String, Uuid)>,
    Json(request): Json<SaveAnswersRequest>,
) -> crate::error::Result<impl IntoResponse> {
    let attempt = state
        .attempt_service
        .save_answers(&token, attempt_id, request.answers)
        .await?;
    Ok(ApiResponse::ok(
        "Answers saved",
        json!({ "attemptId": attempt.id, "updatedAt": attempt.updated_at }),
    ))
}

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path((token, attempt_id)): Path<(String, Uuid)>,
) -> crate::error::Result<impl IntoResponse> {
    let attempt = state.attempt_service.submit(&token, attempt_id).await?;

    state.audit.record(
        AuditEvent::new(None, "submit_attempt", "attempt", attempt.id)
            .with_details(json!({ "link_token": token })),
    );

    Ok(ApiResponse::ok(
        "Attempt submitted",
        SubmitAttemptResponse {
            attempt_id: attempt.id,
            status: attempt.status,
            submitted_at: attempt.submitted_at,
        },
    ))
}

#[axum::debug_handler]
pub async fn create_order(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<CreateOrderPayload>,
) -> crate::error::Result<impl IntoResponse> {
    payload.validate()?;

    let link = state.link_service.find_by_token(&token).await?;
    let purchase = state
        .purchase_service
        .create_order(&link, &payload.email, payload.name.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        "Payment order created",
        CreateOrderResponse {
            order_id: purchase.order_id,
            amount: purchase.amount,
            currency: purchase.currency,
            status: purchase.status,
        },
    ))
}
