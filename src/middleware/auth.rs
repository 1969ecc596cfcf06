use crate::handlers::auth::verify_jwt_token;
use crate::models::auth::{Claims, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Extension, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    let auth_header = match headers.get("Authorization") {
        Some(header) => header,
        None => return Ok(None),
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    auth_str
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim()))
        .ok_or("Invalid Authorization header format. Expected 'Bearer <token>'")
}

/// Claims of the caller, if a valid token was presented. Used by routes where
/// anonymous access is allowed and each operation decides on its own.
pub fn resolve_claims(headers: &HeaderMap, jwt_secret: &str) -> Option<Claims> {
    let token = match bearer_token(headers) {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(reason) => {
            tracing::debug!("Ignoring Authorization header: {}", reason);
            return None;
        }
    };

    match verify_jwt_token(token, jwt_secret) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            None
        }
    }
}

pub async fn auth_middleware(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let unauthorized = |message: &str| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                message: message.to_string(),
            }),
        )
    };

    let token = match bearer_token(&headers) {
        Ok(Some(token)) => token,
        Ok(None) => return Err(unauthorized("Missing Authorization header")),
        Err(reason) => return Err(unauthorized(reason)),
    };

    // Verify the JWT token
    let claims = match verify_jwt_token(token, &state.settings.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err(unauthorized("Invalid or expired token"));
        }
    };

    // Add the claims to the request extensions so handlers can access them
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
