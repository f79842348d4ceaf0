use application::NotificationRepository;
use async_trait::async_trait;
use domain::{
    Notification, NotificationId, NotificationType, Page, PageRequest, RepositoryError, Timestamp,
    UserId,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{map_sqlx_err, to_count};

// `type` 是保留字，读出时改名为 kind
const SELECT_NOTIFICATION: &str = "SELECT id, title, message, type AS kind, is_read, action_url, \
     reference_id, recipient_id, sender_id, created_at FROM notifications";

#[derive(Debug, FromRow)]
struct NotificationRecord {
    id: Uuid,
    title: String,
    message: String,
    kind: NotificationType,
    is_read: bool,
    action_url: Option<String>,
    reference_id: Option<Uuid>,
    recipient_id: Uuid,
    sender_id: Option<Uuid>,
    created_at: Timestamp,
}

impl From<NotificationRecord> for Notification {
    fn from(value: NotificationRecord) -> Self {
        Notification {
            id: NotificationId::from(value.id),
            title: value.title,
            message: value.message,
            kind: value.kind,
            is_read: value.is_read,
            action_url: value.action_url,
            reference_id: value.reference_id,
            recipient_id: UserId::from(value.recipient_id),
            sender_id: value.sender_id.map(UserId::from),
            created_at: value.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            INSERT INTO notifications (id, title, message, type, is_read, action_url,
                                       reference_id, recipient_id, sender_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, title, message, type AS kind, is_read, action_url,
                      reference_id, recipient_id, sender_id, created_at
            "#,
        )
        .bind(notification.id.0)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind)
        .bind(notification.is_read)
        .bind(&notification.action_url)
        .bind(notification.reference_id)
        .bind(notification.recipient_id.0)
        .bind(notification.sender_id.map(|id| id.0))
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "{SELECT_NOTIFICATION} WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Notification::from))
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id.0)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn list_for_recipient(
        &self,
        recipient_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Notification>, RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1")
                .bind(recipient_id.0)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            "{SELECT_NOTIFICATION} WHERE recipient_id = $1 \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        ))
        .bind(recipient_id.0)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let content = records.into_iter().map(Notification::from).collect();
        Ok(Page::new(content, page, to_count(total)))
    }

    async fn count_unread(&self, recipient_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(to_count(count))
    }
}
