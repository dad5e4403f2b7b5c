use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use super::notification_models::{
    DeliveryRecord, NewNotification, Notification, NotificationStatus, NotificationType,
};

#[derive(Debug, Clone)]
pub struct NotificationFilters {
    /// Only honoured by `list_all`; user listings are always scoped to the caller.
    pub user_id: Option<Uuid>,
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<NotificationType>,
    pub page: u32,
    pub size: u32,
}

impl NotificationFilters {
    pub fn limit(&self) -> i64 {
        i64::from(self.size.max(1))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for NotificationFilters {
    fn default() -> Self {
        Self {
            user_id: None,
            status: None,
            notification_type: None,
            page: 1,
            size: 20,
        }
    }
}

/// Persistence for notifications.
///
/// User-scoped methods operate on the caller's view: their own notifications plus
/// every broadcast, with broadcast status and `read_at` taken from the caller's receipt.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> Result<Notification>;

    /// Raw record, ignoring receipts.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>>;

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>>;

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filters: &NotificationFilters,
    ) -> Result<(Vec<Notification>, i64)>;

    async fn list_all(&self, filters: &NotificationFilters) -> Result<(Vec<Notification>, i64)>;

    async fn count_unread(&self, user_id: Uuid) -> Result<i64>;

    async fn status_counts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(NotificationStatus, NotificationType, i64)>>;

    /// Moves every id to `status` in one transaction. Fails without changes when an id is
    /// not visible to the user or a transition is not allowed.
    async fn update_status(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        status: NotificationStatus,
    ) -> Result<Vec<Notification>>;

    /// Returns how many notifications went from unread to read.
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;

    async fn mark_sent(&self, id: Uuid) -> Result<Option<Notification>>;

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<()>;
}

pub(crate) fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Notification {} not found", id))
}

pub(crate) fn check_transition(current: &Notification, next: NotificationStatus) -> Result<()> {
    if current.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Notification {} cannot go from {} to {}",
            current.id, current.status, next
        )))
    }
}

/// Distinct ids in ascending order. Rows are always locked in this order so
/// two overlapping bulk updates cannot deadlock.
pub(crate) fn lock_order(ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

const USER_VIEW_COLUMNS: &str = "n.id, n.title_en, n.title_ar, n.message_en, n.message_ar, \
    n.notification_type, n.priority, n.user_id, \
    COALESCE(r.status, n.status) AS status, \
    n.data, n.created_at, n.sent_at, \
    COALESCE(r.read_at, n.read_at) AS read_at";

// $1 is always the viewing user
const USER_VIEW_FROM: &str = "FROM notifications n \
    LEFT JOIN notification_receipts r ON r.notification_id = n.id AND r.user_id = $1 \
    WHERE (n.user_id = $1 OR n.user_id IS NULL)";

const USER_VIEW_FILTERS: &str = "AND (($2::notification_status IS NULL \
        AND COALESCE(r.status, n.status) <> 'archived') \
        OR COALESCE(r.status, n.status) = $2) \
    AND ($3::notification_type IS NULL OR n.notification_type = $3)";

const ADMIN_FILTERS: &str = "WHERE ($1::uuid IS NULL OR user_id = $1) \
    AND ($2::notification_status IS NULL OR status = $2) \
    AND ($3::notification_type IS NULL OR notification_type = $3)";

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, new: NewNotification) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications
                (title_en, title_ar, message_en, message_ar,
                 notification_type, priority, user_id, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(&new.title_en)
        .bind(&new.title_ar)
        .bind(&new.message_en)
        .bind(&new.message_ar)
        .bind(new.notification_type)
        .bind(new.priority)
        .bind(new.user_id)
        .bind(&new.data)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(notification)
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        let query = format!("SELECT {USER_VIEW_COLUMNS} {USER_VIEW_FROM} AND n.id = $2");
        let notification = sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filters: &NotificationFilters,
    ) -> Result<(Vec<Notification>, i64)> {
        let count_query = format!("SELECT COUNT(*) {USER_VIEW_FROM} {USER_VIEW_FILTERS}");
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(user_id)
            .bind(filters.status)
            .bind(filters.notification_type)
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            "SELECT {USER_VIEW_COLUMNS} {USER_VIEW_FROM} {USER_VIEW_FILTERS} \
             ORDER BY n.created_at DESC, n.id DESC LIMIT $4 OFFSET $5"
        );
        let notifications = sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(filters.status)
            .bind(filters.notification_type)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((notifications, total))
    }

    async fn list_all(&self, filters: &NotificationFilters) -> Result<(Vec<Notification>, i64)> {
        let count_query = format!("SELECT COUNT(*) FROM notifications {ADMIN_FILTERS}");
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(filters.user_id)
            .bind(filters.status)
            .bind(filters.notification_type)
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            "SELECT * FROM notifications {ADMIN_FILTERS} \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let notifications = sqlx::query_as::<_, Notification>(&query)
            .bind(filters.user_id)
            .bind(filters.status)
            .bind(filters.notification_type)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((notifications, total))
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64> {
        let query = format!(
            "SELECT COUNT(*) {USER_VIEW_FROM} AND COALESCE(r.status, n.status) = 'unread'"
        );
        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn status_counts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(NotificationStatus, NotificationType, i64)>> {
        let query = format!(
            "SELECT COALESCE(r.status, n.status) AS status, n.notification_type, COUNT(*) \
             {USER_VIEW_FROM} GROUP BY 1, 2"
        );
        let counts = sqlx::query_as::<_, (NotificationStatus, NotificationType, i64)>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(counts)
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        status: NotificationStatus,
    ) -> Result<Vec<Notification>> {
        let select = format!("SELECT {USER_VIEW_COLUMNS} {USER_VIEW_FROM} AND n.id = $2");
        let select_for_update = format!("{select} FOR UPDATE OF n");

        // Dropping the transaction on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(ids.len());

        for id in lock_order(ids) {
            let current = sqlx::query_as::<_, Notification>(&select_for_update)
                .bind(user_id)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| not_found(id))?;

            check_transition(&current, status)?;
            if current.status == status {
                updated.push(current);
                continue;
            }

            if current.is_broadcast() {
                sqlx::query(
                    "INSERT INTO notification_receipts (notification_id, user_id, status, read_at)
                     VALUES ($1, $2, $3, CASE WHEN $3 = 'read'::notification_status THEN NOW() END)
                     ON CONFLICT (notification_id, user_id) DO UPDATE SET
                        status = EXCLUDED.status,
                        read_at = COALESCE(notification_receipts.read_at, EXCLUDED.read_at)",
                )
                .bind(id)
                .bind(user_id)
                .bind(status)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(
                    "UPDATE notifications SET
                        status = $1,
                        read_at = CASE WHEN $1 = 'read'::notification_status
                                       THEN COALESCE(read_at, NOW()) ELSE read_at END
                     WHERE id = $2",
                )
                .bind(status)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }

            let notification = sqlx::query_as::<_, Notification>(&select)
                .bind(user_id)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            updated.push(notification);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let own = sqlx::query(
            "UPDATE notifications SET status = 'read', read_at = NOW()
             WHERE user_id = $1 AND status = 'unread'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let new_receipts = sqlx::query(
            "INSERT INTO notification_receipts (notification_id, user_id, status, read_at)
             SELECT n.id, $1, 'read'::notification_status, NOW()
             FROM notifications n
             WHERE n.user_id IS NULL
               AND NOT EXISTS (
                   SELECT 1 FROM notification_receipts r
                   WHERE r.notification_id = n.id AND r.user_id = $1
               )
             ON CONFLICT (notification_id, user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let unread_receipts = sqlx::query(
            "UPDATE notification_receipts SET status = 'read', read_at = NOW()
             WHERE user_id = $1 AND status = 'unread'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(own + new_receipts + unread_receipts)
    }

    async fn mark_sent(&self, id: Uuid) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET sent_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO notification_deliveries
                (notification_id, user_id, channel, recipient, success, error, attempted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.notification_id)
        .bind(record.user_id)
        .bind(record.channel.as_str())
        .bind(&record.recipient)
        .bind(record.success)
        .bind(&record.error)
        .bind(record.attempted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
