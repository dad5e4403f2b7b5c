use crate::error::{AppError, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;
use validator::Validate;

use super::notification_dto::{BroadcastRequest, CreateNotificationRequest};
use super::notification_models::{
    NewNotification, Notification, NotificationStats, NotificationStatus, Priority,
};
use super::notification_repository::{NotificationFilters, NotificationStore};

const LIVE_FEED_CAPACITY: usize = 100;

/// Service layer for notification business logic.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    notification_tx: broadcast::Sender<Notification>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        let (notification_tx, _) = broadcast::channel(LIVE_FEED_CAPACITY);
        Self {
            store,
            notification_tx,
        }
    }

    /// Live feed of every notification created from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notification_tx.subscribe()
    }

    pub async fn create(&self, payload: CreateNotificationRequest) -> Result<Notification> {
        payload.validate()?;

        let notification_type = payload
            .notification_type
            .ok_or_else(|| AppError::Validation("notification_type is required".to_string()))?;
        let priority = payload.priority.unwrap_or_else(|| Priority::default().value());

        let notification = self
            .store
            .create(NewNotification {
                title_en: payload.title_en.trim().to_string(),
                title_ar: payload.title_ar.trim().to_string(),
                message_en: payload.message_en.trim().to_string(),
                message_ar: payload.message_ar.trim().to_string(),
                notification_type,
                priority,
                user_id: payload.user_id,
                data: payload.data,
            })
            .await?;

        match notification.user_id {
            Some(user_id) => tracing::info!(
                notification_id = %notification.id,
                %user_id,
                notification_type = %notification.notification_type,
                "notification created"
            ),
            None => tracing::info!(
                notification_id = %notification.id,
                notification_type = %notification.notification_type,
                "broadcast notification created"
            ),
        }

        // No subscribers is fine.
        let _ = self.notification_tx.send(notification.clone());

        Ok(notification)
    }

    pub async fn broadcast(&self, payload: BroadcastRequest) -> Result<Notification> {
        self.create(payload.into()).await
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        filters: NotificationFilters,
    ) -> Result<(Vec<Notification>, i64)> {
        self.store.list_for_user(user_id, &filters).await
    }

    pub async fn list_all(&self, filters: NotificationFilters) -> Result<(Vec<Notification>, i64)> {
        self.store.list_all(&filters).await
    }

    pub async fn get(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification> {
        self.store
            .find_for_user(notification_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        self.store.count_unread(user_id).await
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification> {
        self.set_one(user_id, notification_id, NotificationStatus::Read)
            .await
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let count = self.store.mark_all_read(user_id).await?;
        tracing::debug!(%user_id, count, "marked all notifications read");
        Ok(count)
    }

    pub async fn bulk_update(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        status: NotificationStatus,
    ) -> Result<Vec<Notification>> {
        if notification_ids.is_empty() {
            return Err(AppError::Validation(
                "notification_ids must not be empty".to_string(),
            ));
        }

        let updated = self
            .store
            .update_status(user_id, notification_ids, status)
            .await?;
        tracing::debug!(%user_id, %status, count = updated.len(), "bulk status update");
        Ok(updated)
    }

    pub async fn archive(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification> {
        self.set_one(user_id, notification_id, NotificationStatus::Archived)
            .await
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<NotificationStats> {
        let counts = self.store.status_counts(user_id).await?;
        Ok(NotificationStats::from_counts(counts))
    }

    async fn set_one(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        status: NotificationStatus,
    ) -> Result<Notification> {
        self.store
            .update_status(user_id, &[notification_id], status)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::notification_memory_store::InMemoryNotificationStore;
    use crate::notification::notification_models::NotificationType;

    fn service() -> NotificationService {
        NotificationService::new(Arc::new(InMemoryNotificationStore::new()))
    }

    fn request(user_id: Option<Uuid>) -> CreateNotificationRequest {
        CreateNotificationRequest {
            title_en: "Booking Confirmed!".to_string(),
            title_ar: "تم تأكيد الحجز!".to_string(),
            message_en: "Your booking is confirmed.".to_string(),
            message_ar: "تم تأكيد حجزك.".to_string(),
            notification_type: Some(NotificationType::BookingConfirmed),
            priority: None,
            user_id,
            data: None,
            send_immediately: false,
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let service = service();
        let user_id = Uuid::new_v4();

        let notification = service.create(request(Some(user_id))).await.unwrap();

        assert_eq!(notification.priority, 1);
        assert_eq!(notification.status, NotificationStatus::Unread);
        assert_eq!(notification.user_id, Some(user_id));
        assert!(notification.read_at.is_none());
        assert!(notification.sent_at.is_none());
    }

    #[tokio::test]
    async fn test_create_requires_both_languages() {
        let service = service();
        let mut req = request(Some(Uuid::new_v4()));
        req.message_ar = String::new();

        let err = service.create(req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut req = request(Some(Uuid::new_v4()));
        req.title_en = "   ".to_string();
        assert!(matches!(
            service.create(req).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_priority() {
        let service = service();
        let mut req = request(Some(Uuid::new_v4()));
        req.priority = Some(5);
        assert!(matches!(
            service.create(req).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let service = service();
        let user_id = Uuid::new_v4();
        let created = service.create(request(Some(user_id))).await.unwrap();

        let first = service.mark_read(user_id, created.id).await.unwrap();
        let second = service.mark_read(user_id, created.id).await.unwrap();

        assert_eq!(first.status, NotificationStatus::Read);
        assert_eq!(second.status, NotificationStatus::Read);
        assert!(first.read_at.is_some());
        assert_eq!(first.read_at, second.read_at);
    }

    #[tokio::test]
    async fn test_mark_read_rejects_other_users() {
        let service = service();
        let owner = Uuid::new_v4();
        let created = service.create(request(Some(owner))).await.unwrap();

        let err = service.mark_read(Uuid::new_v4(), created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service.mark_read(owner, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unread_count_after_reading_some() {
        let service = service();
        let user_id = Uuid::new_v4();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(service.create(request(Some(user_id))).await.unwrap().id);
        }
        service.create(request(Some(Uuid::new_v4()))).await.unwrap();

        for id in &ids[..2] {
            service.mark_read(user_id, *id).await.unwrap();
        }

        assert_eq!(service.unread_count(user_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bulk_update_changes_only_given_ids() {
        let service = service();
        let user_id = Uuid::new_v4();
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(service.create(request(Some(user_id))).await.unwrap().id);
        }

        let updated = service
            .bulk_update(user_id, &ids[..2], NotificationStatus::Read)
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);

        for (i, id) in ids.iter().enumerate() {
            let n = service.get(user_id, *id).await.unwrap();
            let expected = if i < 2 {
                NotificationStatus::Read
            } else {
                NotificationStatus::Unread
            };
            assert_eq!(n.status, expected);
        }
    }

    #[tokio::test]
    async fn test_bulk_update_is_all_or_nothing() {
        let service = service();
        let user_id = Uuid::new_v4();
        let mine = service.create(request(Some(user_id))).await.unwrap();
        let theirs = service.create(request(Some(Uuid::new_v4()))).await.unwrap();

        let err = service
            .bulk_update(user_id, &[mine.id, theirs.id], NotificationStatus::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let unchanged = service.get(user_id, mine.id).await.unwrap();
        assert_eq!(unchanged.status, NotificationStatus::Unread);
    }

    #[tokio::test]
    async fn test_archived_is_terminal() {
        let service = service();
        let user_id = Uuid::new_v4();
        let created = service.create(request(Some(user_id))).await.unwrap();

        service.archive(user_id, created.id).await.unwrap();
        let err = service.mark_read(user_id, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = service
            .bulk_update(user_id, &[created.id], NotificationStatus::Unread)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_archive_hides_from_default_listing() {
        let service = service();
        let user_id = Uuid::new_v4();
        let kept = service.create(request(Some(user_id))).await.unwrap();
        let archived = service.create(request(Some(user_id))).await.unwrap();
        service.archive(user_id, archived.id).await.unwrap();

        let (listed, total) = service
            .list(user_id, NotificationFilters::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(listed[0].id, kept.id);

        let (archived_list, _) = service
            .list(
                user_id,
                NotificationFilters {
                    status: Some(NotificationStatus::Archived),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(archived_list.len(), 1);

        let (all, _) = service
            .list_all(NotificationFilters::default())
            .await
            .unwrap();
        assert!(all.iter().any(|n| n.id == archived.id));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let service = service();
        let user_id = Uuid::new_v4();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(service.create(request(Some(user_id))).await.unwrap().id);
        }

        let (page, total) = service
            .list(
                user_id,
                NotificationFilters {
                    page: 1,
                    size: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, ids[2]);
        assert_eq!(page[1].id, ids[1]);
    }

    #[tokio::test]
    async fn test_broadcast_has_per_user_state() {
        let service = service();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let broadcast = service
            .broadcast(BroadcastRequest {
                title_en: "Notice".to_string(),
                title_ar: "إشعار".to_string(),
                message_en: "New destinations".to_string(),
                message_ar: "وجهات جديدة".to_string(),
                notification_type: None,
                priority: None,
                data: None,
                send_immediately: false,
            })
            .await
            .unwrap();
        assert!(broadcast.is_broadcast());
        assert_eq!(broadcast.priority, 2);

        for user in [alice, bob] {
            let (listed, _) = service
                .list(user, NotificationFilters::default())
                .await
                .unwrap();
            assert!(listed.iter().any(|n| n.id == broadcast.id));
            assert_eq!(service.unread_count(user).await.unwrap(), 1);
        }

        service.mark_read(alice, broadcast.id).await.unwrap();
        assert_eq!(service.unread_count(alice).await.unwrap(), 0);
        assert_eq!(service.unread_count(bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_read_covers_broadcasts() {
        let service = service();
        let user_id = Uuid::new_v4();
        service.create(request(Some(user_id))).await.unwrap();
        service.create(request(Some(user_id))).await.unwrap();
        service.create(request(None)).await.unwrap();

        assert_eq!(service.mark_all_read(user_id).await.unwrap(), 3);
        assert_eq!(service.unread_count(user_id).await.unwrap(), 0);
        assert_eq!(service.mark_all_read(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats_counts_by_status_and_type() {
        let service = service();
        let user_id = Uuid::new_v4();
        let a = service.create(request(Some(user_id))).await.unwrap();
        let b = service.create(request(Some(user_id))).await.unwrap();
        let mut promo = request(Some(user_id));
        promo.notification_type = Some(NotificationType::Promotion);
        service.create(promo).await.unwrap();

        service.mark_read(user_id, a.id).await.unwrap();
        service.archive(user_id, b.id).await.unwrap();

        let stats = service.stats(user_id).await.unwrap();
        assert_eq!(stats.total_notifications, 3);
        assert_eq!(stats.unread_count, 1);
        assert_eq!(stats.read_count, 1);
        assert_eq!(stats.archived_count, 1);
        assert_eq!(stats.by_type["booking_confirmed"], 2);
        assert_eq!(stats.by_type["promotion"], 1);
        assert_eq!(stats.by_type["payment_failed"], 0);
    }

    #[tokio::test]
    async fn test_created_notifications_reach_subscribers() {
        let service = service();
        let mut rx = service.subscribe();
        let created = service.create(request(Some(Uuid::new_v4()))).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, created.id);
    }
}
