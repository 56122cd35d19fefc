//! services/api/src/web/auth.rs
//!
//! Bearer token issuance and the authentication endpoints for registration,
//! login and the current profile.

use axum::{extract::State, http::StatusCode, Json};
use chirp_core::{ServiceError, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::web::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

//=========================================================================================
// Tokens
//=========================================================================================

/// The payload signed into every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn issue(&self, user: &User) -> ApiResult<String> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> ApiResult<String> {
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("JWT encode failed: {e}")))
    }

    /// Checks the signature and the expiry.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized("Unauthorized".to_string())
            })
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

fn authenticated(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let access_token = state.tokens.issue(&user)?;
    Ok(AuthResponse {
        user: user.into(),
        access_token,
    })
}

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Email or username already exists", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = state.users.register(req.into()).await?;
    Ok((StatusCode::CREATED, Json(authenticated(&state, user)?)))
}

/// POST /auth/login - Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state.users.authenticate(&req.email, &req.password).await?;
    Ok(Json(authenticated(&state, user)?))
}

/// GET /auth/profile - The account behind the bearer token
#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "User profile retrieved successfully", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<UserResponse>> {
    // A token can outlive its account.
    let user = state.users.find_by_id(auth.id).await.map_err(|e| match e {
        ServiceError::NotFound(_) => ApiError::Unauthorized("Unauthorized".to_string()),
        other => other.into(),
    })?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            username: "ada".into(),
            display_name: None,
            bio: None,
            profile_image_url: None,
            banner_image_url: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = TokenService::new("secret", 3600);
        let user = user();
        let claims = tokens.verify(&tokens.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = TokenService::new("one", 3600).issue(&user()).unwrap();
        let err = TokenService::new("two", 3600).verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new("secret", 60);
        let token = tokens
            .issue_at(&user(), Utc::now() - Duration::hours(1))
            .unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(TokenService::new("secret", 60).verify("not.a.jwt").is_err());
    }
}
