use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use uuid::Uuid;
use validator::Validate;

use crate::{
    delivery::DeliveryReport,
    error::{AppError, Result},
    middleware::{AdminUser, AuthUser},
    state::AppState,
};
use super::{
    notification_dto::{
        AdminNotificationQuery, ApiResponse, BroadcastRequest, BulkUpdateRequest,
        CreateNotificationRequest, DomainEvent, NotificationQuery, PaginatedResponse,
        UnreadCountResponse,
    },
    notification_models::{Notification, NotificationStats},
    notification_repository::NotificationFilters,
};

/// List the caller's notifications, including broadcasts
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Paginated notifications", body = PaginatedNotifications),
        (status = 400, description = "Invalid filters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<PaginatedResponse<Notification>>> {
    query.validate()?;

    let filters = NotificationFilters {
        user_id: None,
        status: query.status,
        notification_type: query.notification_type,
        page: query.page.unwrap_or(1),
        size: query.size.unwrap_or(20),
    };

    let (notifications, total) = state
        .notification_service
        .list(user_id, filters.clone())
        .await?;

    Ok(Json(PaginatedResponse::new(
        notifications,
        total,
        filters.page,
        filters.size,
    )))
}

/// Create a notification for one user (admin)
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Target user not found")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn create_notification(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>)> {
    if let Some(user_id) = payload.user_id {
        state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
    }

    let send_immediately = payload.send_immediately;
    let notification = state.notification_service.create(payload).await?;

    if send_immediately {
        state.dispatcher.spawn(notification.id);
    }

    Ok((StatusCode::CREATED, Json(notification)))
}

/// Count the caller's unread notifications
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_unread_count(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UnreadCountResponse>> {
    let unread_count = state.notification_service.unread_count(user_id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

#[utoipa::path(
    get,
    path = "/api/notifications/stats",
    responses(
        (status = 200, description = "Notification statistics", body = NotificationStats),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_notification_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<NotificationStats>> {
    let stats = state.notification_service.stats(user_id).await?;
    Ok(Json(stats))
}

/// Subscribe to new notifications via Server-Sent Events
#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    responses(
        (status = 200, description = "SSE stream of notifications"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn notification_stream(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.notification_service.subscribe();

    // Lagged receivers drop the missed items and keep going.
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(notification) if notification.is_visible_to(user_id) => Event::default()
            .event("notification")
            .json_data(&notification)
            .ok()
            .map(Ok),
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "Notification not found"),
        (status = 409, description = "Notification is archived")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>> {
    let notification = state
        .notification_service
        .mark_read(user_id, notification_id)
        .await?;
    Ok(Json(notification))
}

#[utoipa::path(
    put,
    path = "/api/notifications/mark-all-read",
    responses(
        (status = 200, description = "All notifications marked as read", body = ApiResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse>> {
    let updated = state.notification_service.mark_all_read(user_id).await?;
    Ok(Json(ApiResponse::ok(format!(
        "Marked {} notifications as read",
        updated
    ))))
}

/// Apply one status to several notifications at once
#[utoipa::path(
    put,
    path = "/api/notifications/bulk-update",
    request_body = BulkUpdateRequest,
    responses(
        (status = 200, description = "Notifications updated", body = ApiResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "A notification was not found"),
        (status = 409, description = "A status transition is not allowed")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn bulk_update_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<BulkUpdateRequest>,
) -> Result<Json<ApiResponse>> {
    payload.validate()?;

    let updated = state
        .notification_service
        .bulk_update(user_id, &payload.notification_ids, payload.status)
        .await?;

    Ok(Json(ApiResponse::ok(format!(
        "Updated {} notifications to {}",
        updated.len(),
        payload.status
    ))))
}

/// Archive a notification (it stays visible to admins)
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification archived", body = ApiResponse),
        (status = 404, description = "Notification not found")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn archive_notification(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<ApiResponse>> {
    state
        .notification_service
        .archive(user_id, notification_id)
        .await?;
    Ok(Json(ApiResponse::ok("Notification archived")))
}

/// Send a notification to every user (admin)
#[utoipa::path(
    post,
    path = "/api/notifications/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 201, description = "Broadcast created", body = Notification),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin access required")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn broadcast_notification(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<BroadcastRequest>,
) -> Result<(StatusCode, Json<Notification>)> {
    let send_immediately = payload.send_immediately;
    let notification = state.notification_service.broadcast(payload).await?;

    tracing::info!(%admin_id, notification_id = %notification.id, "broadcast requested");
    if send_immediately {
        state.dispatcher.spawn(notification.id);
    }

    Ok((StatusCode::CREATED, Json(notification)))
}

/// List every notification, archived ones included (admin)
#[utoipa::path(
    get,
    path = "/api/notifications/admin/all",
    params(AdminNotificationQuery),
    responses(
        (status = 200, description = "Paginated notifications", body = PaginatedNotifications),
        (status = 403, description = "Admin access required")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_all_notifications(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(query): Query<AdminNotificationQuery>,
) -> Result<Json<PaginatedResponse<Notification>>> {
    query.validate()?;

    let filters = NotificationFilters {
        user_id: query.user_id,
        status: query.status,
        notification_type: query.notification_type,
        page: query.page.unwrap_or(1),
        size: query.size.unwrap_or(20),
    };

    let (notifications, total) = state.notification_service.list_all(filters.clone()).await?;

    Ok(Json(PaginatedResponse::new(
        notifications,
        total,
        filters.page,
        filters.size,
    )))
}

/// Deliver a stored notification over email and SMS now (admin)
#[utoipa::path(
    post,
    path = "/api/notifications/send/{id}",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Delivery attempted", body = DeliveryReport),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Notification not found")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn send_notification(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<DeliveryReport>> {
    let report = state.dispatcher.dispatch(notification_id).await?;
    Ok(Json(report))
}

/// Create a templated notification from a booking, payment or account event (admin)
#[utoipa::path(
    post,
    path = "/api/notifications/events",
    request_body = DomainEvent,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Unknown or malformed event"),
        (status = 403, description = "Admin access required")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn submit_event(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Json(event): Json<DomainEvent>,
) -> Result<(StatusCode, Json<Notification>)> {
    let notification = state.notification_helper.handle_event(event).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

