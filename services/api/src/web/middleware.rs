//! services/api/src/web/middleware.rs
//!
//! The bearer token guard, expressed as an extractor so that protected
//! handlers simply take an `AuthUser` argument.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

/// The caller identified by a valid `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("Unauthorized".to_string())
}

/// Pulls the token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(unauthorized)?;

        let claims = state.tokens.verify(token)?;
        Ok(AuthUser { id: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Argon2Hasher;
    use crate::config::Config;
    use axum::http::Request;
    use chirp_core::{MemoryStore, User};
    use chrono::Utc;

    fn state() -> Arc<AppState> {
        let config = Config::from_lookup(|key| match key {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            "JWT_SECRET" => Some("guard-secret".to_string()),
            _ => None,
        })
        .unwrap();
        Arc::new(AppState::new(
            Arc::new(config),
            Arc::new(MemoryStore::new()),
            Arc::new(Argon2Hasher::new()),
        ))
    }

    async fn extract(
        state: &Arc<AppState>,
        authorization: Option<String>,
    ) -> Result<AuthUser, ApiError> {
        let mut builder = Request::builder().uri("/auth/profile");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn token_subject_becomes_the_caller() {
        let state = state();
        let now = Utc::now();
        let user = User {
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
        };
        let token = state.tokens.issue(&user).unwrap();

        let caller = extract(&state, Some(format!("Bearer {token}"))).await.unwrap();
        assert_eq!(caller, AuthUser { id: user.id });

        let missing = extract(&state, None).await;
        assert!(matches!(missing, Err(ApiError::Unauthorized(_))));
        let forged = extract(&state, Some("Bearer forged.token.value".to_string())).await;
        assert!(matches!(forged, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn bearer_scheme_is_required() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
