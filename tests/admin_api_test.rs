use std::env;

use assessment_backend::middleware::auth::Claims;
use assessment_backend::services::audit_service::spawn_audit_writer;
use assessment_backend::AppState;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

fn ensure_config() {
    dotenvy::dotenv().ok();
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("PAYMENT_WEBHOOK_SECRET", "whsec_test");
    env::set_var("MAIL_API_URL", "http://127.0.0.1:9/mail");
    env::set_var("MAIL_API_KEY", "mail_test");
    env::set_var("MAIL_FROM_ADDRESS", "noreply@example.com");
    env::set_var("ASSESSMENT_BASE_URL", "http://localhost:3000");
    env::set_var("ADMIN_RPS", "1000");
    env::set_var("PUBLIC_RPS", "1000");
    let _ = assessment_backend::config::init_config();
}

async fn setup() -> (PgPool, AppState, Router) {
    ensure_config();
    let pool = assessment_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let audit = spawn_audit_writer(pool.clone());
    let state = AppState::new(pool.clone(), audit);

    let app = Router::new()
        .route(
            "/api/assessment-links",
            get(assessment_backend::routes::links::list_links)
                .post(assessment_backend::routes::links::create_link),
        )
        .route(
            "/api/assessment-links/email-history/all",
            get(assessment_backend::routes::links::all_email_history),
        )
        .route(
            "/api/assessment-links/:link_id/deactivate",
            post(assessment_backend::routes::links::deactivate_link),
        )
        .route(
            "/api/assessment-links/:link_id/results",
            get(assessment_backend::routes::links::link_results),
        )
        .route(
            "/api/assessment-links/:link_id/email-history",
            get(assessment_backend::routes::links::link_email_history),
        )
        .route(
            "/api/assessment-links/:link_id/send-email",
            post(assessment_backend::routes::links::send_link_email),
        )
        .route("/api/tests", post(assessment_backend::routes::links::create_test))
        .route(
            "/api/tests/:test_id",
            get(assessment_backend::routes::links::get_test),
        )
        .layer(axum::middleware::from_fn(
            assessment_backend::middleware::auth::require_admin,
        ))
        .with_state(state.clone());

    (pool, state, app)
}

async fn seed_admin(pool: &PgPool) -> Uuid {
    let admin_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, 'admin')")
        .bind(admin_id)
        .bind("API Admin")
        .bind(format!("api_admin_{}@example.com", admin_id))
        .execute(pool)
        .await
        .expect("seed admin");
    admin_id
}

fn bearer_token(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        role: Some(role.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret("test_secret_key".as_bytes()),
    )
    .unwrap()
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn admin_endpoints_are_role_gated() {
    let (pool, _state, app) = setup().await;
    let admin_id = seed_admin(&pool).await;

    let (status, _) = request(&app, "GET", "/api/assessment-links", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let viewer = bearer_token(admin_id, "viewer");
    let (status, _) =
        request(&app, "GET", "/api/assessment-links", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = bearer_token(admin_id, "admin");
    let (status, body) =
        request(&app, "GET", "/api/assessment-links", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["pagination"]["total"].is_number());
}

#[tokio::test]
async fn link_lifecycle_through_the_api() {
    let (pool, _state, app) = setup().await;
    let admin_id = seed_admin(&pool).await;
    let token = bearer_token(admin_id, "admin");

    let (status, body) = request(
        &app,
        "POST",
        "/api/tests",
        Some(&token),
        Some(json!({
            "title": "Mood Screening",
            "questions": [{ "id": "q1", "text": "Rate your mood" }],
            "eligibility": [{ "kind": "min_age", "min_age": 18 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let test_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        "POST",
        "/api/assessment-links",
        Some(&token),
        Some(json!({
            "testId": test_id,
            "campaignName": "autumn-screening",
            "maxAttempts": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let link_token = body["data"]["token"].as_str().unwrap();
    assert_eq!(link_token.len(), 64);
    let link_id = body["data"]["id"].as_str().unwrap().to_string();

    // Unknown test is rejected.
    let (status, _) = request(
        &app,
        "POST",
        "/api/assessment-links",
        Some(&token),
        Some(json!({ "testId": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/assessment-links/{}/results", link_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));

    // The mail API is unreachable in tests; the endpoint still answers 200
    // with every recipient recorded as failed.
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/assessment-links/{}/send-email", link_id),
        Some(&token),
        Some(json!({
            "recipientEmails": ["one@example.com", "two@example.com"],
            "customMessage": "Please complete this by Friday"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["successful"], json!(0));
    assert_eq!(body["data"]["failed"], json!(2));
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/assessment-links/{}/email-history", link_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], json!(2));

    let (status, _) = request(
        &app,
        "GET",
        "/api/assessment-links/email-history/all",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/assessment-links/{}/deactivate", link_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], json!(false));

    // Bad recipient address is a validation error.
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/assessment-links/{}/send-email", link_id),
        Some(&token),
        Some(json!({ "recipientEmails": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
