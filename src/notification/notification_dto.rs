use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::notification_models::{Notification, NotificationStatus, NotificationType};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

/// Admin request to create a notification for one user, or a broadcast when `user_id` is absent.
///
/// Missing text fields deserialize as empty strings so they surface as validation errors.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateNotificationRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub title_en: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub title_ar: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub message_en: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub message_ar: String,
    #[validate(required)]
    pub notification_type: Option<NotificationType>,
    #[validate(range(min = 1, max = 4))]
    pub priority: Option<i16>,
    pub user_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub send_immediately: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BroadcastRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub title_en: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub title_ar: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub message_en: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub message_ar: String,
    /// Defaults to `admin_announcement`.
    pub notification_type: Option<NotificationType>,
    /// Defaults to 2.
    #[validate(range(min = 1, max = 4))]
    pub priority: Option<i16>,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub send_immediately: bool,
}

impl From<BroadcastRequest> for CreateNotificationRequest {
    fn from(req: BroadcastRequest) -> Self {
        Self {
            title_en: req.title_en,
            title_ar: req.title_ar,
            message_en: req.message_en,
            message_ar: req.message_ar,
            notification_type: Some(
                req.notification_type
                    .unwrap_or(NotificationType::AdminAnnouncement),
            ),
            priority: Some(req.priority.unwrap_or(2)),
            user_id: None,
            data: req.data,
            send_immediately: req.send_immediately,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, max = 100))]
    pub notification_ids: Vec<Uuid>,
    pub status: NotificationStatus,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    /// Without a status, archived notifications are left out.
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<NotificationType>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminNotificationQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<NotificationType>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(PaginatedNotifications = PaginatedResponse<Notification>)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: u32, size: u32) -> Self {
        let total_pages = (total as f64 / size.max(1) as f64).ceil() as u32;
        Self {
            data,
            total,
            page,
            size,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// What the helper layer needs to know about a booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingSummary {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub reference: String,
    pub travel_date: NaiveDate,
    pub package_title_en: Option<String>,
    pub package_title_ar: Option<String>,
    pub total_price: Option<f64>,
    pub travelers_count: Option<i32>,
}

impl BookingSummary {
    pub fn package_title_en(&self) -> &str {
        self.package_title_en.as_deref().unwrap_or("Travel Package")
    }

    pub fn package_title_ar(&self) -> &str {
        self.package_title_ar.as_deref().unwrap_or("حزمة السفر")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentSummary {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub booking_reference: String,
    pub amount: f64,
    pub currency: String,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
}

/// Events other subsystems submit to have a templated notification created.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingConfirmed {
        booking: BookingSummary,
    },
    BookingCancelled {
        booking: BookingSummary,
        reason: Option<String>,
    },
    BookingUpdated {
        booking: BookingSummary,
        changes: String,
    },
    PaymentSuccess {
        payment: PaymentSummary,
    },
    PaymentFailed {
        payment: PaymentSummary,
        reason: Option<String>,
    },
    PaymentRefunded {
        payment: PaymentSummary,
    },
    PackageUpdate {
        booking: BookingSummary,
        details: String,
    },
    ReviewAdded {
        user_id: Uuid,
        package_title: String,
    },
    UserRegistered {
        user_id: Uuid,
    },
    TravelReminder {
        booking: BookingSummary,
        hours_before: u32,
    },
    WeatherUpdate {
        booking: BookingSummary,
        weather_info: String,
    },
    Promotion {
        user_id: Uuid,
        title: String,
        message: String,
    },
    CancellationPolicyReminder {
        booking: BookingSummary,
    },
    /// Uses the type's default text. A missing `user_id` makes it a broadcast.
    Generic {
        user_id: Option<Uuid>,
        notification_type: NotificationType,
        #[schema(value_type = Option<Object>)]
        data: Option<serde_json::Value>,
    },
}
