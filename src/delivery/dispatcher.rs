use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ChannelSender, OutboundMessage};
use crate::notification::notification_models::{
    DeliveryChannel, DeliveryRecord, Language, Notification,
};
use crate::notification::notification_repository::{not_found, NotificationStore};
use crate::user::user_models::User;
use crate::user::user_repository::UserDirectory;

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryReport {
    pub notification_id: Uuid,
    pub recipients: usize,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Pushes stored notifications out over every registered channel.
///
/// Attempts are recorded whether or not they succeed. Nothing is retried.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    channels: Vec<Arc<dyn ChannelSender>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        channels: Vec<Arc<dyn ChannelSender>>,
    ) -> Self {
        Self {
            store,
            users,
            channels,
        }
    }

    /// Runs `dispatch` on a background task. Failures are only logged.
    pub fn spawn(&self, notification_id: Uuid) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(notification_id).await {
                tracing::warn!(%notification_id, error = %e, "background dispatch failed");
            }
        });
    }

    pub async fn dispatch(&self, notification_id: Uuid) -> Result<DeliveryReport> {
        let notification = self
            .store
            .find_by_id(notification_id)
            .await?
            .ok_or_else(|| not_found(notification_id))?;

        let recipients = self.recipients(&notification).await?;
        let mut report = DeliveryReport {
            notification_id,
            recipients: recipients.len(),
            attempted: 0,
            delivered: 0,
            failed: 0,
            sent_at: None,
        };

        for user in &recipients {
            for sender in &self.channels {
                let channel = sender.channel();
                let Some(address) = address_for(user, channel) else {
                    continue;
                };

                let message = render(&notification, user, channel);
                let outcome = sender.deliver(address, &message).await;

                report.attempted += 1;
                let error = match outcome {
                    Ok(()) => {
                        report.delivered += 1;
                        None
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            notification_id = %notification.id,
                            user_id = %user.id,
                            %channel,
                            error = %e,
                            "notification delivery failed"
                        );
                        Some(e.to_string())
                    }
                };

                let record = DeliveryRecord {
                    notification_id: notification.id,
                    user_id: user.id,
                    channel,
                    recipient: address.to_string(),
                    success: error.is_none(),
                    error,
                    attempted_at: Utc::now(),
                };
                if let Err(e) = self.store.record_delivery(&record).await {
                    tracing::warn!(
                        notification_id = %notification.id,
                        error = %e,
                        "failed to record delivery attempt"
                    );
                }
            }
        }

        report.sent_at = self
            .store
            .mark_sent(notification_id)
            .await?
            .and_then(|n| n.sent_at);

        tracing::info!(
            notification_id = %notification_id,
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed,
            "notification dispatched"
        );

        Ok(report)
    }

    async fn recipients(&self, notification: &Notification) -> Result<Vec<User>> {
        match notification.user_id {
            Some(user_id) => Ok(self.users.find_by_id(user_id).await?.into_iter().collect()),
            None => self.users.find_active().await,
        }
    }
}

fn address_for(user: &User, channel: DeliveryChannel) -> Option<&str> {
    let address = match channel {
        DeliveryChannel::Email => user.email.as_deref(),
        DeliveryChannel::Sms => user.mobile.as_deref(),
    };
    address.map(str::trim).filter(|a| !a.is_empty())
}

/// Renders the notification in the user's language for one channel.
pub fn render(
    notification: &Notification,
    user: &User,
    channel: DeliveryChannel,
) -> OutboundMessage {
    let language = user.preferred_language();
    let title = notification.title(language);
    let message = notification.message(language);

    match channel {
        DeliveryChannel::Email => {
            let body = match language {
                Language::En => format!(
                    "Dear {},\n\n{}\n\nBest regards,\nDubai Travel Agency Team",
                    user.name, message
                ),
                Language::Ar => format!(
                    "عزيزي {}،\n\n{}\n\nمع أطيب التحيات،\nفريق وكالة دبي للسفر",
                    user.name, message
                ),
            };
            OutboundMessage {
                subject: format!("Travel Agency Notification: {}", title),
                body,
            }
        }
        DeliveryChannel::Sms => OutboundMessage {
            subject: title.to_string(),
            body: message.to_string(),
        },
    }
}
