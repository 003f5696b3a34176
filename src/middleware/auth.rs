use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// Identity of the authenticated administrator, inserted as a request
/// extension for handlers that need `created_by`/`sent_by`.
#[derive(Debug, Clone, Copy)]
pub struct AdminContext {
    pub user_id: Uuid,
}

fn unauthorized(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": reason })),
    )
        .into_response()
}

pub async fn require_admin(mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("Missing authorization header");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("Malformed authorization header");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("Unsupported authorization scheme");
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data,
        Err(_) => return unauthorized("Invalid token"),
    };

    let role = data.claims.role.clone().unwrap_or_default();
    if !role.eq_ignore_ascii_case("admin") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "success": false, "message": "Administrator role required" })),
        )
            .into_response();
    }

    let Ok(user_id) = data.claims.sub.parse::<Uuid>() else {
        return unauthorized("Invalid token subject");
    };

    req.extensions_mut().insert(AdminContext { user_id });
    req.extensions_mut().insert(data.claims);
    next.run(req).await
}
