use crate::delivery::Dispatcher;
use crate::error::Result;
use serde_json::{json, Value};
use uuid::Uuid;

use super::notification_dto::{
    BookingSummary, CreateNotificationRequest, DomainEvent, PaymentSummary,
};
use super::notification_models::{Notification, NotificationType, Priority};
use super::notification_service::NotificationService;
use super::notification_templates::{self as templates, Template};

/// Creates templated notifications for booking, payment and account events,
/// then hands each one to the dispatcher.
///
/// Delivery problems are logged and never fail the call.
#[derive(Clone)]
pub struct NotificationHelper {
    service: NotificationService,
    dispatcher: Dispatcher,
}

impl NotificationHelper {
    pub fn new(service: NotificationService, dispatcher: Dispatcher) -> Self {
        Self {
            service,
            dispatcher,
        }
    }

    pub async fn handle_event(&self, event: DomainEvent) -> Result<Notification> {
        match event {
            DomainEvent::BookingConfirmed { booking } => self.booking_confirmed(&booking).await,
            DomainEvent::BookingCancelled { booking, reason } => {
                self.booking_cancelled(&booking, reason.as_deref()).await
            }
            DomainEvent::BookingUpdated { booking, changes } => {
                self.booking_updated(&booking, &changes).await
            }
            DomainEvent::PaymentSuccess { payment } => self.payment_success(&payment).await,
            DomainEvent::PaymentFailed { payment, reason } => {
                self.payment_failed(&payment, reason.as_deref()).await
            }
            DomainEvent::PaymentRefunded { payment } => self.payment_refunded(&payment).await,
            DomainEvent::PackageUpdate { booking, details } => {
                self.package_update(&booking, &details).await
            }
            DomainEvent::ReviewAdded {
                user_id,
                package_title,
            } => self.review_added(user_id, &package_title).await,
            DomainEvent::UserRegistered { user_id } => self.welcome(user_id).await,
            DomainEvent::TravelReminder {
                booking,
                hours_before,
            } => self.travel_reminder(&booking, hours_before).await,
            DomainEvent::WeatherUpdate {
                booking,
                weather_info,
            } => self.weather_update(&booking, &weather_info).await,
            DomainEvent::Promotion {
                user_id,
                title,
                message,
            } => self.promotion(user_id, &title, &message).await,
            DomainEvent::CancellationPolicyReminder { booking } => {
                self.cancellation_policy_reminder(&booking).await
            }
            DomainEvent::Generic {
                user_id,
                notification_type,
                data,
            } => self.type_default(user_id, notification_type, data).await,
        }
    }

    pub async fn booking_confirmed(&self, booking: &BookingSummary) -> Result<Notification> {
        self.notify(
            templates::booking_confirmed(&booking.reference, booking.travel_date),
            NotificationType::BookingConfirmed,
            Priority::High,
            Some(booking.user_id),
            booking_data(booking),
        )
        .await
    }

    pub async fn booking_cancelled(
        &self,
        booking: &BookingSummary,
        reason: Option<&str>,
    ) -> Result<Notification> {
        let mut data = booking_data(booking);
        data["reason"] = json!(reason);
        self.notify(
            templates::booking_cancelled(&booking.reference, reason),
            NotificationType::BookingCancelled,
            Priority::High,
            Some(booking.user_id),
            data,
        )
        .await
    }

    pub async fn booking_updated(
        &self,
        booking: &BookingSummary,
        changes: &str,
    ) -> Result<Notification> {
        let mut data = booking_data(booking);
        data["changes"] = json!(changes);
        self.notify(
            templates::booking_updated(&booking.reference, changes),
            NotificationType::BookingUpdated,
            Priority::Medium,
            Some(booking.user_id),
            data,
        )
        .await
    }

    pub async fn payment_success(&self, payment: &PaymentSummary) -> Result<Notification> {
        self.notify(
            templates::payment_success(payment.amount, &payment.currency),
            NotificationType::PaymentSuccess,
            Priority::High,
            Some(payment.user_id),
            payment_data(payment),
        )
        .await
    }

    /// An explicit `reason` wins over the one recorded on the payment.
    pub async fn payment_failed(
        &self,
        payment: &PaymentSummary,
        reason: Option<&str>,
    ) -> Result<Notification> {
        let reason = reason.or(payment.failure_reason.as_deref());
        self.notify(
            templates::payment_failed(payment.amount, &payment.currency, reason),
            NotificationType::PaymentFailed,
            Priority::High,
            Some(payment.user_id),
            payment_data(payment),
        )
        .await
    }

    pub async fn payment_refunded(&self, payment: &PaymentSummary) -> Result<Notification> {
        self.notify(
            templates::payment_refunded(
                payment.amount,
                &payment.currency,
                &payment.booking_reference,
            ),
            NotificationType::PaymentRefunded,
            Priority::High,
            Some(payment.user_id),
            payment_data(payment),
        )
        .await
    }

    pub async fn package_update(
        &self,
        booking: &BookingSummary,
        details: &str,
    ) -> Result<Notification> {
        let mut data = booking_data(booking);
        data["details"] = json!(details);
        self.notify(
            templates::package_update(
                booking.package_title_en(),
                booking.package_title_ar(),
                details,
            ),
            NotificationType::PackageUpdate,
            Priority::Medium,
            Some(booking.user_id),
            data,
        )
        .await
    }

    pub async fn review_added(&self, user_id: Uuid, package_title: &str) -> Result<Notification> {
        self.notify(
            templates::review_added(package_title),
            NotificationType::ReviewAdded,
            Priority::Low,
            Some(user_id),
            json!({ "package_title": package_title }),
        )
        .await
    }

    pub async fn welcome(&self, user_id: Uuid) -> Result<Notification> {
        self.notify(
            templates::welcome(),
            NotificationType::AdminAnnouncement,
            Priority::Medium,
            Some(user_id),
            json!({ "welcome": true }),
        )
        .await
    }

    pub async fn travel_reminder(
        &self,
        booking: &BookingSummary,
        hours_before: u32,
    ) -> Result<Notification> {
        let mut data = booking_data(booking);
        data["hours_before"] = json!(hours_before);
        self.notify(
            templates::travel_reminder(
                hours_before,
                booking.package_title_en(),
                booking.package_title_ar(),
            ),
            NotificationType::Reminder,
            Priority::High,
            Some(booking.user_id),
            data,
        )
        .await
    }

    pub async fn weather_update(
        &self,
        booking: &BookingSummary,
        weather_info: &str,
    ) -> Result<Notification> {
        let mut data = booking_data(booking);
        data["weather_info"] = json!(weather_info);
        self.notify(
            templates::weather_update(weather_info),
            NotificationType::Reminder,
            Priority::Medium,
            Some(booking.user_id),
            data,
        )
        .await
    }

    pub async fn promotion(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
    ) -> Result<Notification> {
        self.notify(
            templates::promotion(title, message),
            NotificationType::Promotion,
            Priority::Low,
            Some(user_id),
            json!({ "promotion": true }),
        )
        .await
    }

    pub async fn cancellation_policy_reminder(
        &self,
        booking: &BookingSummary,
    ) -> Result<Notification> {
        self.notify(
            templates::cancellation_policy(),
            NotificationType::Reminder,
            Priority::Medium,
            Some(booking.user_id),
            booking_data(booking),
        )
        .await
    }

    /// Broadcast with caller-supplied text in both languages.
    pub async fn broadcast_announcement(
        &self,
        title_en: &str,
        title_ar: &str,
        message_en: &str,
        message_ar: &str,
    ) -> Result<Notification> {
        let template = Template {
            title: templates::LocalizedText::new(title_en, title_ar),
            message: templates::LocalizedText::new(message_en, message_ar),
        };
        self.notify(
            template,
            NotificationType::AdminAnnouncement,
            Priority::High,
            None,
            json!({ "broadcast": true }),
        )
        .await
    }

    pub async fn type_default(
        &self,
        user_id: Option<Uuid>,
        notification_type: NotificationType,
        data: Option<Value>,
    ) -> Result<Notification> {
        self.notify(
            templates::default_for(notification_type),
            notification_type,
            Priority::Medium,
            user_id,
            data.unwrap_or_else(|| json!({})),
        )
        .await
    }

    async fn notify(
        &self,
        template: Template,
        notification_type: NotificationType,
        priority: Priority,
        user_id: Option<Uuid>,
        data: Value,
    ) -> Result<Notification> {
        let notification = self
            .service
            .create(CreateNotificationRequest {
                title_en: template.title.en,
                title_ar: template.title.ar,
                message_en: template.message.en,
                message_ar: template.message.ar,
                notification_type: Some(notification_type),
                priority: Some(priority.value()),
                user_id,
                data: Some(data),
                send_immediately: true,
            })
            .await?;

        // Delivery runs in the background; the caller only waits on the insert.
        self.dispatcher.spawn(notification.id);

        Ok(notification)
    }
}

fn booking_data(booking: &BookingSummary) -> Value {
    json!({
        "booking_id": booking.booking_id,
        "reference": booking.reference,
        "travel_date": booking.travel_date,
        "package_title": booking.package_title_en(),
        "total_price": booking.total_price,
        "travelers_count": booking.travelers_count,
    })
}

fn payment_data(payment: &PaymentSummary) -> Value {
    json!({
        "payment_id": payment.payment_id,
        "booking_reference": payment.booking_reference,
        "amount": payment.amount,
        "currency": payment.currency,
        "payment_method": payment.payment_method,
        "transaction_id": payment.transaction_id,
    })
}
