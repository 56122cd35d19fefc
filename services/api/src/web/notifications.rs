//! services/api/src/web/notifications.rs

use axum::{extract::State, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::dto::{CountResponse, NotificationResponse};
use crate::web::extract::ApiPath;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

/// The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Notifications", body = [NotificationResponse]),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let notifications = state.notifications.list(auth.id).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/notifications/unread",
    responses(
        (status = 200, description = "Unread notification count", body = CountResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn unread_notifications_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<CountResponse>> {
    let count = state.notifications.unread_count(auth.id).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked as read", body = NotificationResponse),
        (status = 404, description = "Notification not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<NotificationResponse>> {
    let notification = state.notifications.mark_read(auth.id, id).await?;
    Ok(Json(notification.into()))
}

#[utoipa::path(
    patch,
    path = "/notifications/read-all",
    responses(
        (status = 200, description = "Number of notifications marked as read", body = CountResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_all_read_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<CountResponse>> {
    let count = state.notifications.mark_all_read(auth.id).await?;
    Ok(Json(CountResponse { count }))
}
