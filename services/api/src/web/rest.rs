//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::error::ErrorBody;
use crate::web::dto::{
    AuthResponse, ConversationResponse, CountResponse, CreateConversationRequest,
    CreateMessageRequest, CreatePollRequest, CreateTweetRequest, FollowResponse, LikeResponse,
    LoginRequest, MessageCountResponse, MessageResponse, NotificationResponse,
    OptionCountResponse, PageMetaResponse, PollCountResponse, PollOptionResponse,
    PollVoteOutcomeResponse, PollVoteResponse, RegisterRequest, StatusResponse,
    TweetCountResponse, TweetPageResponse, TweetPollResponse, TweetPreviewResponse,
    TweetResponse, UpdateTweetRequest, UpdateUserRequest, UserRef, UserResponse,
    UserSummaryResponse,
};
use crate::web::{auth, messages, notifications, tweets, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::profile_handler,
        tweets::create_tweet_handler,
        tweets::list_tweets_handler,
        tweets::get_tweet_handler,
        tweets::update_tweet_handler,
        tweets::delete_tweet_handler,
        tweets::like_handler,
        tweets::unlike_handler,
        tweets::likes_handler,
        tweets::replies_handler,
        tweets::user_tweets_handler,
        tweets::feed_handler,
        tweets::search_handler,
        tweets::hashtag_handler,
        tweets::respond_to_poll_handler,
        tweets::remove_poll_response_handler,
        users::list_users_handler,
        users::get_user_handler,
        users::get_user_by_username_handler,
        users::update_user_handler,
        users::delete_user_handler,
        users::followers_handler,
        users::following_handler,
        users::follow_handler,
        users::unfollow_handler,
        messages::create_conversation_handler,
        messages::list_conversations_handler,
        messages::get_conversation_handler,
        messages::list_messages_handler,
        messages::send_message_handler,
        messages::unread_messages_handler,
        notifications::list_notifications_handler,
        notifications::unread_notifications_handler,
        notifications::mark_read_handler,
        notifications::mark_all_read_handler,
    ),
    components(
        schemas(
            ErrorBody,
            RegisterRequest, LoginRequest, AuthResponse,
            UserResponse, UserSummaryResponse, UpdateUserRequest, FollowResponse,
            CreateTweetRequest, CreatePollRequest, UpdateTweetRequest,
            TweetResponse, TweetPreviewResponse, TweetCountResponse, TweetPageResponse,
            PageMetaResponse, UserRef, LikeResponse,
            TweetPollResponse, PollOptionResponse, PollCountResponse, OptionCountResponse,
            PollVoteResponse, PollVoteOutcomeResponse,
            NotificationResponse,
            CreateConversationRequest, CreateMessageRequest, ConversationResponse,
            MessageResponse, MessageCountResponse,
            CountResponse, StatusResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and the current profile."),
        (name = "tweets", description = "Tweets, feeds, likes and polls."),
        (name = "users", description = "Profiles and the follow graph."),
        (name = "messages", description = "Direct messaging."),
        (name = "notifications", description = "The per-user notification inbox.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by every guarded route.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_guarded_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/tweets/{id}/like"));
        assert!(doc.paths.paths.contains_key("/notifications/read-all"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
