//! services/api/src/web/users.rs
//!
//! The user directory and the follow graph.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::dto::{
    FollowResponse, StatusResponse, UpdateUserRequest, UserResponse, UserSummaryResponse,
};
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [UserResponse])),
    tag = "users"
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.users.find_all().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(state.users.find_by_id(id).await?.into()))
}

#[utoipa::path(
    get,
    path = "/users/username/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user_by_username_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(state.users.find_by_username(&username).await?.into()))
}

/// Edit your own profile. A new password is hashed before it is stored.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid field", body = ErrorBody),
        (status = 403, description = "Not your profile", body = ErrorBody),
        (status = 409, description = "Email or username already exists", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.users.update(auth.id, id, req.into()).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deleted", body = StatusResponse),
        (status = 403, description = "Not your account", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    state.users.remove(auth.id, id).await?;
    Ok(Json(StatusResponse::new("User deleted")))
}

#[utoipa::path(
    get,
    path = "/users/{id}/followers",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Accounts following the user", body = [UserSummaryResponse]),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn followers_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<UserSummaryResponse>>> {
    let users = state.users.followers(id).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/users/{id}/following",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Accounts the user follows", body = [UserSummaryResponse]),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn following_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<UserSummaryResponse>>> {
    let users = state.users.following(id).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/users/{id}/follow",
    params(("id" = Uuid, Path, description = "User to follow")),
    responses(
        (status = 201, description = "Now following", body = FollowResponse),
        (status = 400, description = "Cannot follow yourself", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Already following this user", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn follow_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<(StatusCode, Json<FollowResponse>)> {
    let follow = state.users.follow(auth.id, id).await?;
    Ok((StatusCode::CREATED, Json(follow.into())))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/follow",
    params(("id" = Uuid, Path, description = "User to unfollow")),
    responses(
        (status = 200, description = "Unfollowed", body = StatusResponse),
        (status = 404, description = "Not following this user", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn unfollow_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    state.users.unfollow(auth.id, id).await?;
    Ok(Json(StatusResponse::new("User unfollowed")))
}
