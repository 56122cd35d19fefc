//! services/api/src/web/messages.rs
//!
//! Direct messaging. Every route requires a bearer token and only
//! participants may see a conversation.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::dto::{
    ConversationResponse, CountResponse, CreateConversationRequest, CreateMessageRequest,
    MessageResponse,
};
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

/// Start a conversation with one or more users. The caller is always included.
#[utoipa::path(
    post,
    path = "/messages/conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = ConversationResponse),
        (status = 400, description = "No other participants", body = ErrorBody),
        (status = 404, description = "Participant not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn create_conversation_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateConversationRequest>,
) -> ApiResult<(StatusCode, Json<ConversationResponse>)> {
    let conversation = state
        .messages
        .create_conversation(auth.id, req.participant_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation.into())))
}

/// The caller's conversations, most recently active first.
#[utoipa::path(
    get,
    path = "/messages/conversations",
    responses(
        (status = 200, description = "Conversations with their latest message", body = [ConversationResponse]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn list_conversations_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<ConversationResponse>>> {
    let conversations = state.messages.conversations(auth.id).await?;
    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/messages/conversations/{id}",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "The conversation", body = ConversationResponse),
        (status = 404, description = "Conversation not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn get_conversation_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ConversationResponse>> {
    Ok(Json(state.messages.conversation(id, auth.id).await?.into()))
}

/// Oldest first. Reading marks the other participants' messages as read.
#[utoipa::path(
    get,
    path = "/messages/conversations/{id}/messages",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Messages in the conversation", body = [MessageResponse]),
        (status = 404, description = "Conversation not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let messages = state.messages.messages(id, auth.id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = MessageResponse),
        (status = 400, description = "Empty message", body = ErrorBody),
        (status = 404, description = "Conversation not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let message = state
        .messages
        .send(auth.id, req.conversation_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[utoipa::path(
    get,
    path = "/messages/unread",
    responses(
        (status = 200, description = "Unread messages sent to the caller", body = CountResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn unread_messages_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<CountResponse>> {
    let count = state.messages.unread_count(auth.id).await?;
    Ok(Json(CountResponse { count }))
}
