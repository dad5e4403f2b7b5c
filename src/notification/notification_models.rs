use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BookingConfirmed,
    BookingCancelled,
    BookingUpdated,
    PaymentSuccess,
    PaymentFailed,
    PaymentRefunded,
    PackageUpdate,
    ReviewAdded,
    AdminAnnouncement,
    Reminder,
    Promotion,
}

impl NotificationType {
    pub const ALL: [NotificationType; 11] = [
        NotificationType::BookingConfirmed,
        NotificationType::BookingCancelled,
        NotificationType::BookingUpdated,
        NotificationType::PaymentSuccess,
        NotificationType::PaymentFailed,
        NotificationType::PaymentRefunded,
        NotificationType::PackageUpdate,
        NotificationType::ReviewAdded,
        NotificationType::AdminAnnouncement,
        NotificationType::Reminder,
        NotificationType::Promotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::BookingConfirmed => "booking_confirmed",
            NotificationType::BookingCancelled => "booking_cancelled",
            NotificationType::BookingUpdated => "booking_updated",
            NotificationType::PaymentSuccess => "payment_success",
            NotificationType::PaymentFailed => "payment_failed",
            NotificationType::PaymentRefunded => "payment_refunded",
            NotificationType::PackageUpdate => "package_update",
            NotificationType::ReviewAdded => "review_added",
            NotificationType::AdminAnnouncement => "admin_announcement",
            NotificationType::Reminder => "reminder",
            NotificationType::Promotion => "promotion",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "notification_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Unread,
    Read,
    Archived,
}

impl NotificationStatus {
    /// `unread -> read -> archived`, `unread -> archived`. Staying put is always allowed.
    pub fn can_transition_to(self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, next),
            (Unread, Unread)
                | (Unread, Read)
                | (Unread, Archived)
                | (Read, Read)
                | (Read, Archived)
                | (Archived, Archived)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "unread",
            NotificationStatus::Read => "read",
            NotificationStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
    Urgent = 4,
}

impl Priority {
    pub fn value(self) -> i16 {
        self as i16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ar,
}

impl Language {
    /// Anything that is not Arabic falls back to English.
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("ar") {
            Language::Ar
        } else {
            Language::En
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub title_en: String,
    pub title_ar: String,
    pub message_en: String,
    pub message_ar: String,
    pub notification_type: NotificationType,
    pub priority: i16,
    /// `None` for broadcasts.
    pub user_id: Option<Uuid>,
    pub status: NotificationStatus,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_broadcast(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.user_id.map_or(true, |owner| owner == user_id)
    }

    pub fn title(&self, language: Language) -> &str {
        match language {
            Language::En => &self.title_en,
            Language::Ar => &self.title_ar,
        }
    }

    pub fn message(&self, language: Language) -> &str {
        match language {
            Language::En => &self.message_en,
            Language::Ar => &self.message_ar,
        }
    }
}

/// A validated notification ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title_en: String,
    pub title_ar: String,
    pub message_en: String,
    pub message_ar: String,
    pub notification_type: NotificationType,
    pub priority: i16,
    pub user_id: Option<Uuid>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Email,
    Sms,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Email => "email",
            DeliveryChannel::Sms => "sms",
        }
    }
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryRecord {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub channel: DeliveryChannel,
    pub recipient: String,
    pub success: bool,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationStats {
    pub total_notifications: i64,
    pub unread_count: i64,
    pub read_count: i64,
    pub archived_count: i64,
    pub by_type: BTreeMap<String, i64>,
}

impl NotificationStats {
    /// Folds `(status, type, count)` groups into totals. Every type is listed, zero when absent.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (NotificationStatus, NotificationType, i64)>,
    {
        let mut stats = NotificationStats {
            by_type: NotificationType::ALL
                .iter()
                .map(|t| (t.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        };

        for (status, notification_type, count) in counts {
            stats.total_notifications += count;
            match status {
                NotificationStatus::Unread => stats.unread_count += count,
                NotificationStatus::Read => stats.read_count += count,
                NotificationStatus::Archived => stats.archived_count += count,
            }
            *stats
                .by_type
                .entry(notification_type.as_str().to_string())
                .or_insert(0) += count;
        }

        stats
    }
}
