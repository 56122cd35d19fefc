//! services/api/src/web/tweets.rs
//!
//! Tweet endpoints: authoring, the paginated listings, likes and poll votes.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::dto::{
    CreateTweetRequest, LikeResponse, PageQuery, PollVoteOutcomeResponse, StatusResponse,
    TweetPageResponse, TweetResponse, UpdateTweetRequest,
};
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

//=========================================================================================
// Authoring
//=========================================================================================

/// Post a tweet, optionally with images, a video or a poll, or as a retweet or reply.
#[utoipa::path(
    post,
    path = "/tweets",
    request_body = CreateTweetRequest,
    responses(
        (status = 201, description = "Tweet created", body = TweetResponse),
        (status = 400, description = "Invalid tweet", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Retweeted or replied-to tweet not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn create_tweet_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateTweetRequest>,
) -> ApiResult<(StatusCode, Json<TweetResponse>)> {
    let tweet = state.tweets.create(auth.id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(tweet.into())))
}

#[utoipa::path(
    get,
    path = "/tweets/{id}",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "The tweet", body = TweetResponse),
        (status = 404, description = "Tweet not found", body = ErrorBody)
    ),
    tag = "tweets"
)]
pub async fn get_tweet_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TweetResponse>> {
    Ok(Json(state.tweets.find_one(id).await?.into()))
}

/// Edit the text or media of your own tweet.
#[utoipa::path(
    patch,
    path = "/tweets/{id}",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    request_body = UpdateTweetRequest,
    responses(
        (status = 200, description = "Tweet updated", body = TweetResponse),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Tweet not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn update_tweet_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTweetRequest>,
) -> ApiResult<Json<TweetResponse>> {
    let tweet = state.tweets.update(id, auth.id, req.into()).await?;
    Ok(Json(tweet.into()))
}

#[utoipa::path(
    delete,
    path = "/tweets/{id}",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "Tweet deleted", body = StatusResponse),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Tweet not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn delete_tweet_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    state.tweets.remove(id, auth.id).await?;
    Ok(Json(StatusResponse::new("Tweet deleted")))
}

//=========================================================================================
// Listings
//=========================================================================================

/// Every tweet, newest first.
#[utoipa::path(
    get,
    path = "/tweets",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of tweets", body = TweetPageResponse),
        (status = 400, description = "Invalid page or limit", body = ErrorBody)
    ),
    tag = "tweets"
)]
pub async fn list_tweets_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<TweetPageResponse>> {
    Ok(Json(state.tweets.find_all(query.request()?).await?.into()))
}

#[utoipa::path(
    get,
    path = "/tweets/user/{userId}",
    params(("userId" = Uuid, Path, description = "Author ID"), PageQuery),
    responses(
        (status = 200, description = "A page of the user's tweets", body = TweetPageResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "tweets"
)]
pub async fn user_tweets_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<TweetPageResponse>> {
    let page = state.tweets.user_tweets(user_id, query.request()?).await?;
    Ok(Json(page.into()))
}

/// The caller's own tweets plus those of everyone they follow.
#[utoipa::path(
    get,
    path = "/tweets/feed/me",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of the home feed", body = TweetPageResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn feed_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<TweetPageResponse>> {
    let page = state.tweets.feed(auth.id, query.request()?).await?;
    Ok(Json(page.into()))
}

/// Case-insensitive search over tweet text and hashtag names.
#[utoipa::path(
    get,
    path = "/tweets/search/{query}",
    params(("query" = String, Path, description = "Search text"), PageQuery),
    responses(
        (status = 200, description = "A page of matching tweets", body = TweetPageResponse)
    ),
    tag = "tweets"
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(text): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<TweetPageResponse>> {
    let page = state.tweets.search(&text, query.request()?).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/tweets/hashtag/{tag}",
    params(("tag" = String, Path, description = "Hashtag without the leading #"), PageQuery),
    responses(
        (status = 200, description = "A page of tagged tweets", body = TweetPageResponse)
    ),
    tag = "tweets"
)]
pub async fn hashtag_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(tag): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<TweetPageResponse>> {
    let page = state.tweets.by_hashtag(&tag, query.request()?).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/tweets/{id}/replies",
    params(("id" = Uuid, Path, description = "Tweet ID"), PageQuery),
    responses(
        (status = 200, description = "A page of replies", body = TweetPageResponse),
        (status = 404, description = "Tweet not found", body = ErrorBody)
    ),
    tag = "tweets"
)]
pub async fn replies_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<TweetPageResponse>> {
    let page = state.tweets.replies(id, query.request()?).await?;
    Ok(Json(page.into()))
}

//=========================================================================================
// Likes
//=========================================================================================

#[utoipa::path(
    post,
    path = "/tweets/{id}/like",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    responses(
        (status = 201, description = "Tweet liked", body = LikeResponse),
        (status = 400, description = "Tweet already liked", body = ErrorBody),
        (status = 404, description = "Tweet not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn like_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<(StatusCode, Json<LikeResponse>)> {
    let like = state.tweets.like(id, auth.id).await?;
    Ok((StatusCode::CREATED, Json(like.into())))
}

#[utoipa::path(
    delete,
    path = "/tweets/{id}/like",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "Like removed", body = StatusResponse),
        (status = 400, description = "Tweet not liked", body = ErrorBody),
        (status = 404, description = "Tweet not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn unlike_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    state.tweets.unlike(id, auth.id).await?;
    Ok(Json(StatusResponse::new("Tweet unliked")))
}

#[utoipa::path(
    get,
    path = "/tweets/{id}/likes",
    params(("id" = Uuid, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "Who liked the tweet", body = [LikeResponse]),
        (status = 404, description = "Tweet not found", body = ErrorBody)
    ),
    tag = "tweets"
)]
pub async fn likes_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<LikeResponse>>> {
    let likes = state.tweets.likes(id).await?;
    Ok(Json(likes.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Polls
//=========================================================================================

/// Vote for an option. Clicking your current option again withdraws the vote;
/// clicking another option moves it.
#[utoipa::path(
    post,
    path = "/tweets/poll/option/{optionId}/respond",
    params(("optionId" = Uuid, Path, description = "Poll option ID")),
    responses(
        (status = 201, description = "Vote recorded, moved or withdrawn", body = PollVoteOutcomeResponse),
        (status = 400, description = "Poll has expired", body = ErrorBody),
        (status = 404, description = "Poll option not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn respond_to_poll_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(option_id): ApiPath<Uuid>,
) -> ApiResult<(StatusCode, Json<PollVoteOutcomeResponse>)> {
    let outcome = state.tweets.respond_to_poll(option_id, auth.id).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[utoipa::path(
    delete,
    path = "/tweets/poll/{pollId}/response",
    params(("pollId" = Uuid, Path, description = "Poll ID")),
    responses(
        (status = 200, description = "Vote withdrawn", body = StatusResponse),
        (status = 400, description = "Poll has expired", body = ErrorBody),
        (status = 404, description = "No vote to withdraw", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "tweets"
)]
pub async fn remove_poll_response_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(poll_id): ApiPath<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    state.tweets.remove_poll_response(poll_id, auth.id).await?;
    Ok(Json(StatusResponse::new("Poll response removed")))
}
