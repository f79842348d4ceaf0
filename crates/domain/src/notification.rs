use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{NotificationId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    NewResume,
    ResumeStatusUpdated,
    JobExpired,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub is_read: bool,
    pub action_url: Option<String>,
    /// 关联实体（例如投递记录）的 ID
    pub reference_id: Option<Uuid>,
    pub recipient_id: UserId,
    pub sender_id: Option<UserId>,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(
        recipient_id: UserId,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            title: title.into(),
            message: message.into(),
            kind,
            is_read: false,
            action_url: None,
            reference_id: None,
            recipient_id,
            sender_id: None,
            created_at: now,
        }
    }

    pub fn with_action(mut self, action_url: impl Into<String>, reference_id: Uuid) -> Self {
        self.action_url = Some(action_url.into());
        self.reference_id = Some(reference_id);
        self
    }

    pub fn with_sender(mut self, sender_id: Option<UserId>) -> Self {
        self.sender_id = sender_id;
        self
    }
}
