use crate::{
    delivery::DeliveryReport,
    middleware::auth_middleware,
    notification::{
        notification_dto::{
            ApiResponse, BookingSummary, BroadcastRequest, BulkUpdateRequest,
            CreateNotificationRequest, DomainEvent, PaginatedNotifications, PaymentSummary,
            UnreadCountResponse,
        },
        notification_handlers,
        notification_models::{
            DeliveryChannel, Notification, NotificationStats, NotificationStatus,
            NotificationType,
        },
    },
    state::AppState,
};
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::notification::notification_handlers::get_notifications,
        crate::notification::notification_handlers::create_notification,
        crate::notification::notification_handlers::get_unread_count,
        crate::notification::notification_handlers::get_notification_stats,
        crate::notification::notification_handlers::notification_stream,
        crate::notification::notification_handlers::mark_notification_read,
        crate::notification::notification_handlers::mark_all_read,
        crate::notification::notification_handlers::bulk_update_notifications,
        crate::notification::notification_handlers::archive_notification,
        crate::notification::notification_handlers::broadcast_notification,
        crate::notification::notification_handlers::get_all_notifications,
        crate::notification::notification_handlers::send_notification,
        crate::notification::notification_handlers::submit_event,
    ),
    components(
        schemas(
            Notification,
            NotificationType,
            NotificationStatus,
            NotificationStats,
            DeliveryChannel,
            DeliveryReport,
            CreateNotificationRequest,
            BroadcastRequest,
            BulkUpdateRequest,
            PaginatedNotifications,
            UnreadCountResponse,
            ApiResponse,
            DomainEvent,
            BookingSummary,
            PaymentSummary,
        )
    ),
    tags(
        (name = "notifications", description = "Bilingual notification endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let list_or_create = || {
        get(notification_handlers::get_notifications)
            .post(notification_handlers::create_notification)
    };

    // Admin-only handlers check the role through the AdminUser extractor.
    let notification_routes = Router::new()
        .route("/", list_or_create())
        .route("/unread-count", get(notification_handlers::get_unread_count))
        .route("/stats", get(notification_handlers::get_notification_stats))
        .route("/stream", get(notification_handlers::notification_stream))
        .route("/mark-all-read", put(notification_handlers::mark_all_read))
        .route(
            "/bulk-update",
            put(notification_handlers::bulk_update_notifications),
        )
        .route("/broadcast", post(notification_handlers::broadcast_notification))
        .route("/admin/all", get(notification_handlers::get_all_notifications))
        .route("/send/:id", post(notification_handlers::send_notification))
        .route("/events", post(notification_handlers::submit_event))
        .route("/:id/read", put(notification_handlers::mark_notification_read))
        .route("/:id", delete(notification_handlers::archive_notification))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // nest() maps "/" to the bare prefix only, so the trailing-slash form
    // needs its own route.
    let api_routes = Router::new()
        .route(
            "/notifications/",
            list_or_create().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest("/notifications", notification_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
