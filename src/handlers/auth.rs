use crate::middleware::auth::auth_middleware;
use crate::models::auth::*;
use crate::store::StoreError;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post, Router},
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;
const TOKEN_LIFETIME_HOURS: i64 = 24;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
        }),
    )
}

fn internal_error() -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

pub fn auth_routes() -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(current_user))
        .layer(axum::middleware::from_fn(auth_middleware));

    Router::new()
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/login", post(login))
        .merge(protected)
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if !EMAIL_RE.is_match(email) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters long", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

async fn sign_up(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim();
    validate_credentials(email, &payload.password)?;

    if payload.password != payload.confirm_password {
        return Err(api_error(StatusCode::BAD_REQUEST, "Passwords do not match"));
    }

    // Hash the password
    let password_hash = hash(&payload.password, state.settings.bcrypt_cost).map_err(|e| {
        tracing::error!("Error hashing password: {}", e);
        internal_error()
    })?;

    let user = match state.store.create_user(email, &password_hash).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            return Err(api_error(StatusCode::CONFLICT, "User with this email already exists"));
        }
        Err(e) => {
            tracing::error!("Error creating user: {}", e);
            return Err(internal_error());
        }
    };

    tracing::info!(user_id = %user.id, "user signed up");
    let token = generate_jwt_token(&user, &state.settings.jwt_secret)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Account created successfully".to_string(),
        user: UserResponse::from(user),
        token,
    }))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim();
    validate_credentials(email, &payload.password)?;

    let user = match state.store.find_user_by_email(email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid email or password"));
        }
        Err(e) => {
            tracing::error!("Database error finding user: {}", e);
            return Err(internal_error());
        }
    };

    // Verify password
    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid email or password"));
        }
        Err(e) => {
            tracing::error!("Error verifying password: {}", e);
            return Err(internal_error());
        }
    }

    let token = generate_jwt_token(&user, &state.settings.jwt_secret)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Logged in successfully".to_string(),
        user: UserResponse::from(user),
        token,
    }))
}

async fn current_user(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| api_error(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

    match state.store.find_user_by_id(id).await {
        Ok(Some(user)) => Ok(Json(UserResponse::from(user))),
        Ok(None) => Err(api_error(StatusCode::UNAUTHORIZED, "User no longer exists")),
        Err(e) => {
            tracing::error!("Database error loading current user: {}", e);
            Err(internal_error())
        }
    }
}

pub fn generate_jwt_token(user: &User, jwt_secret: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let expiration = now + Duration::hours(TOKEN_LIFETIME_HOURS);

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        exp: expiration.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| {
        tracing::error!("Error generating JWT token: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate authentication token",
        )
    })
}

pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{body_json, json_request, test_state};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn tokens_round_trip_with_the_same_secret_only() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        let token = generate_jwt_token(&user, "secret").unwrap();
        let claims = verify_jwt_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert!(verify_jwt_token(&token, "other").is_err());
    }

    #[test]
    fn credentials_are_validated() {
        assert!(validate_credentials("a@example.com", "secret").is_ok());
        assert!(validate_credentials("not-an-email", "secret").is_err());
        assert!(validate_credentials("a@example.com", "12345").is_err());
    }

    #[tokio::test]
    async fn sign_up_login_and_me() {
        let app = crate::handlers::router(test_state());

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/auth/sign-up",
                None,
                json!({"email": "a@example.com", "password": "secret1", "confirm_password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/auth/login",
                None,
                json!({"email": "a@example.com", "password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::get("/api/auth/me")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "a@example.com");
    }

    #[tokio::test]
    async fn sign_up_rejects_mismatched_passwords_and_duplicates() {
        let app = crate::handlers::router(test_state());

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/auth/sign-up",
                None,
                json!({"email": "a@example.com", "password": "secret1", "confirm_password": "secret2"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Passwords do not match");

        let payload = json!({"email": "a@example.com", "password": "secret1", "confirm_password": "secret1"});
        let first = app
            .clone()
            .oneshot(json_request("/api/auth/sign-up", None, payload.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app
            .oneshot(json_request("/api/auth/sign-up", None, payload))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = crate::handlers::router(test_state());
        app.clone()
            .oneshot(json_request(
                "/api/auth/sign-up",
                None,
                json!({"email": "a@example.com", "password": "secret1", "confirm_password": "secret1"}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                "/api/auth/login",
                None,
                json!({"email": "a@example.com", "password": "wrong-password"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_requires_a_bearer_token() {
        let app = crate::handlers::router(test_state());
        let response = app
            .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
