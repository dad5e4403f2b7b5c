use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::notification_models::{
    DeliveryRecord, NewNotification, Notification, NotificationStatus, NotificationType,
};
use super::notification_repository::{
    check_transition, lock_order, not_found, NotificationFilters, NotificationStore,
};

#[derive(Debug, Clone, Copy)]
struct Receipt {
    status: NotificationStatus,
    read_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct MemoryState {
    /// Insertion order.
    notifications: Vec<Notification>,
    /// Keyed by `(notification_id, user_id)`.
    receipts: HashMap<(Uuid, Uuid), Receipt>,
    deliveries: Vec<DeliveryRecord>,
}

impl MemoryState {
    fn view(&self, notification: &Notification, user_id: Uuid) -> Notification {
        let mut view = notification.clone();
        if notification.is_broadcast() {
            if let Some(receipt) = self.receipts.get(&(notification.id, user_id)) {
                view.status = receipt.status;
                view.read_at = receipt.read_at;
            }
        }
        view
    }

    /// Everything the user can see, newest first.
    fn visible_to(&self, user_id: Uuid) -> Vec<Notification> {
        let mut visible: Vec<Notification> = self
            .notifications
            .iter()
            .rev()
            .filter(|n| n.is_visible_to(user_id))
            .map(|n| self.view(n, user_id))
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        visible
    }

    fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Option<Notification> {
        self.notifications
            .iter()
            .find(|n| n.id == id && n.is_visible_to(user_id))
            .map(|n| self.view(n, user_id))
    }

    fn set_status(
        &mut self,
        id: Uuid,
        user_id: Uuid,
        status: NotificationStatus,
        now: DateTime<Utc>,
    ) {
        let Some(notification) = self.notifications.iter_mut().find(|n| n.id == id) else {
            return;
        };

        if notification.is_broadcast() {
            let receipt = self.receipts.entry((id, user_id)).or_insert(Receipt {
                status: NotificationStatus::Unread,
                read_at: None,
            });
            receipt.status = status;
            if status == NotificationStatus::Read && receipt.read_at.is_none() {
                receipt.read_at = Some(now);
            }
        } else {
            notification.status = status;
            if status == NotificationStatus::Read && notification.read_at.is_none() {
                notification.read_at = Some(now);
            }
        }
    }
}

fn paginate(items: Vec<Notification>, filters: &NotificationFilters) -> (Vec<Notification>, i64) {
    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(filters.offset() as usize)
        .take(filters.limit() as usize)
        .collect();
    (page, total)
}

/// Notification store kept in process memory, with the same broadcast receipt
/// semantics as the Postgres repository.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    state: Mutex<MemoryState>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deliveries(&self) -> Vec<DeliveryRecord> {
        self.state.lock().await.deliveries.clone()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            title_en: new.title_en,
            title_ar: new.title_ar,
            message_en: new.message_en,
            message_ar: new.message_ar,
            notification_type: new.notification_type,
            priority: new.priority,
            user_id: new.user_id,
            status: NotificationStatus::Unread,
            data: new.data,
            created_at: Utc::now(),
            sent_at: None,
            read_at: None,
        };

        self.state.lock().await.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        let state = self.state.lock().await;
        Ok(state.notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        Ok(self.state.lock().await.find_for_user(id, user_id))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filters: &NotificationFilters,
    ) -> Result<(Vec<Notification>, i64)> {
        let state = self.state.lock().await;
        let matching = state
            .visible_to(user_id)
            .into_iter()
            .filter(|n| match filters.status {
                Some(status) => n.status == status,
                None => n.status != NotificationStatus::Archived,
            })
            .filter(|n| {
                filters
                    .notification_type
                    .map_or(true, |t| n.notification_type == t)
            })
            .collect();

        Ok(paginate(matching, filters))
    }

    async fn list_all(&self, filters: &NotificationFilters) -> Result<(Vec<Notification>, i64)> {
        let state = self.state.lock().await;
        let mut matching: Vec<Notification> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| filters.user_id.map_or(true, |u| n.user_id == Some(u)))
            .filter(|n| filters.status.map_or(true, |s| n.status == s))
            .filter(|n| {
                filters
                    .notification_type
                    .map_or(true, |t| n.notification_type == t)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(paginate(matching, filters))
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64> {
        let state = self.state.lock().await;
        let count = state
            .visible_to(user_id)
            .iter()
            .filter(|n| n.status == NotificationStatus::Unread)
            .count();
        Ok(count as i64)
    }

    async fn status_counts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(NotificationStatus, NotificationType, i64)>> {
        let state = self.state.lock().await;
        let mut counts: HashMap<(NotificationStatus, NotificationType), i64> = HashMap::new();
        for n in state.visible_to(user_id) {
            *counts.entry((n.status, n.notification_type)).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((status, t), count)| (status, t, count))
            .collect())
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        status: NotificationStatus,
    ) -> Result<Vec<Notification>> {
        let mut state = self.state.lock().await;
        let ids = lock_order(ids);

        // Check every id before touching anything.
        for id in &ids {
            let current = state.find_for_user(*id, user_id).ok_or_else(|| not_found(*id))?;
            check_transition(&current, status)?;
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            state.set_status(id, user_id, status, now);
            if let Some(notification) = state.find_for_user(id, user_id) {
                updated.push(notification);
            }
        }

        Ok(updated)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let mut state = self.state.lock().await;
        let unread: Vec<Uuid> = state
            .visible_to(user_id)
            .into_iter()
            .filter(|n| n.status == NotificationStatus::Unread)
            .map(|n| n.id)
            .collect();

        let now = Utc::now();
        for id in &unread {
            state.set_status(*id, user_id, NotificationStatus::Read, now);
        }

        Ok(unread.len() as u64)
    }

    async fn mark_sent(&self, id: Uuid) -> Result<Option<Notification>> {
        let mut state = self.state.lock().await;
        Ok(state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| {
                n.sent_at = Some(Utc::now());
                n.clone()
            }))
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        self.state.lock().await.deliveries.push(record.clone());
        Ok(())
    }
}
