//! services/api/src/web/mod.rs
//!
//! The HTTP surface: handlers grouped by resource, the bearer token guard and
//! the router that ties them together.

pub mod auth;
pub mod dto;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod rest;
pub mod state;
pub mod tweets;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiError;
use rest::ApiDoc;
use state::AppState;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

fn cors_layer(origin: &str) -> Result<CorsLayer, ApiError> {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        let value = HeaderValue::from_str(origin).map_err(|e| {
            ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
        })?;
        AllowOrigin::exact(value)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]))
}

/// Builds the complete application: every REST route, the Swagger UI and the
/// tracing, CORS and body-limit layers.
pub fn app_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let cors = cors_layer(&state.config.cors_origin)?;

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/profile", get(auth::profile_handler));

    let tweet_routes = Router::new()
        .route(
            "/tweets",
            post(tweets::create_tweet_handler).get(tweets::list_tweets_handler),
        )
        .route(
            "/tweets/{id}",
            get(tweets::get_tweet_handler)
                .patch(tweets::update_tweet_handler)
                .delete(tweets::delete_tweet_handler),
        )
        .route(
            "/tweets/{id}/like",
            post(tweets::like_handler).delete(tweets::unlike_handler),
        )
        .route("/tweets/{id}/likes", get(tweets::likes_handler))
        .route("/tweets/{id}/replies", get(tweets::replies_handler))
        .route("/tweets/user/{userId}", get(tweets::user_tweets_handler))
        .route("/tweets/feed/me", get(tweets::feed_handler))
        .route("/tweets/search/{query}", get(tweets::search_handler))
        .route("/tweets/hashtag/{tag}", get(tweets::hashtag_handler))
        .route(
            "/tweets/poll/option/{optionId}/respond",
            post(tweets::respond_to_poll_handler),
        )
        .route(
            "/tweets/poll/{pollId}/response",
            delete(tweets::remove_poll_response_handler),
        );

    let user_routes = Router::new()
        .route("/users", get(users::list_users_handler))
        .route(
            "/users/{id}",
            get(users::get_user_handler)
                .patch(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route(
            "/users/username/{username}",
            get(users::get_user_by_username_handler),
        )
        .route("/users/{id}/followers", get(users::followers_handler))
        .route("/users/{id}/following", get(users::following_handler))
        .route(
            "/users/{id}/follow",
            post(users::follow_handler).delete(users::unfollow_handler),
        );

    let message_routes = Router::new()
        .route("/messages", post(messages::send_message_handler))
        .route(
            "/messages/conversations",
            post(messages::create_conversation_handler).get(messages::list_conversations_handler),
        )
        .route(
            "/messages/conversations/{id}",
            get(messages::get_conversation_handler),
        )
        .route(
            "/messages/conversations/{id}/messages",
            get(messages::list_messages_handler),
        )
        .route("/messages/unread", get(messages::unread_messages_handler));

    let notification_routes = Router::new()
        .route("/notifications", get(notifications::list_notifications_handler))
        .route(
            "/notifications/unread",
            get(notifications::unread_notifications_handler),
        )
        .route(
            "/notifications/read-all",
            patch(notifications::mark_all_read_handler),
        )
        .route(
            "/notifications/{id}/read",
            patch(notifications::mark_read_handler),
        );

    let api_router = Router::new()
        .merge(auth_routes)
        .merge(tweet_routes)
        .merge(user_routes)
        .merge(message_routes)
        .merge(notification_routes)
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}
