//! 站内通知：查询、已读标记，以及投递相关事件的通知生成。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::{
    Company, Job, Notification, NotificationId, NotificationType, Page, PageRequest, Resume,
    User, UserId, ROLE_ADMIN,
};
use tracing::info;

use crate::{
    clock::Clock,
    dto::NotificationDto,
    error::ApplicationError,
    repository::{CompanyRepository, NotificationRepository, UserRepository},
};

/// “最新通知”接口返回的条数
pub const LATEST_NOTIFICATIONS: u32 = 10;

pub struct NotificationServiceDependencies {
    pub notification_repository: Arc<dyn NotificationRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub company_repository: Arc<dyn CompanyRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct NotificationService {
    deps: NotificationServiceDependencies,
}

impl NotificationService {
    pub fn new(deps: NotificationServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<NotificationDto>, ApplicationError> {
        let notifications = self
            .deps
            .notification_repository
            .list_for_recipient(user_id, page)
            .await?;
        let senders = self.load_senders(&notifications.content).await?;
        Ok(notifications.map(|n| self.to_dto(n, &senders)))
    }

    pub async fn latest(&self, user_id: UserId) -> Result<Vec<NotificationDto>, ApplicationError> {
        Ok(self
            .list(user_id, PageRequest::new(1, LATEST_NOTIFICATIONS))
            .await?
            .content)
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<u64, ApplicationError> {
        Ok(self
            .deps
            .notification_repository
            .count_unread(user_id)
            .await?)
    }

    pub async fn mark_as_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), ApplicationError> {
        let notification = self
            .deps
            .notification_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("notification", id))?;
        if notification.recipient_id != user_id {
            return Err(ApplicationError::access_denied(
                "notification belongs to another user",
            ));
        }
        self.deps.notification_repository.mark_read(id).await?;
        Ok(())
    }

    pub async fn mark_all_as_read(&self, user_id: UserId) -> Result<u64, ApplicationError> {
        Ok(self
            .deps
            .notification_repository
            .mark_all_read(user_id)
            .await?)
    }

    /// 通知职位所属公司的全部成员以及所有管理员，同一用户只通知一次。
    pub async fn notify_new_resume(
        &self,
        resume: &Resume,
        job: &Job,
        applicant: &User,
    ) -> Result<usize, ApplicationError> {
        let mut recipients = Vec::new();
        if let Some(company_id) = job.company_id {
            recipients.extend(self.deps.user_repository.list_by_company(company_id).await?);
        }
        recipients.extend(self.deps.user_repository.list_by_role_name(ROLE_ADMIN).await?);

        let mut seen = HashSet::new();
        let now = self.deps.clock.now();
        let title = format!("📄 CV mới: {}", job.name);
        let message = format!(
            "{} vừa nộp CV ứng tuyển vị trí {}",
            applicant.name, job.name
        );
        for recipient in recipients.iter().filter(|user| seen.insert(user.id)) {
            let notification = Notification::new(
                recipient.id,
                NotificationType::NewResume,
                title.as_str(),
                message.as_str(),
                now,
            )
            .with_action("/admin/resume", resume.id.0)
            .with_sender(Some(applicant.id));
            self.deps.notification_repository.create(notification).await?;
        }

        info!(resume_id = %resume.id, recipients = seen.len(), "已发送新简历通知");
        Ok(seen.len())
    }

    pub async fn notify_resume_status_updated(
        &self,
        resume: &Resume,
        job: &Job,
        company: Option<&Company>,
        sender_id: Option<UserId>,
    ) -> Result<NotificationDto, ApplicationError> {
        let message = match company {
            Some(company) => format!(
                "CV ứng tuyển vị trí {} tại {} đã được cập nhật: {}",
                job.name,
                company.name,
                resume.status.label_vi()
            ),
            None => format!(
                "CV ứng tuyển vị trí {} đã được cập nhật: {}",
                job.name,
                resume.status.label_vi()
            ),
        };
        let notification = Notification::new(
            resume.user_id,
            NotificationType::ResumeStatusUpdated,
            "📋 Cập nhật trạng thái CV",
            message,
            self.deps.clock.now(),
        )
        .with_action("/user/resumes", resume.id.0)
        .with_sender(sender_id);

        let stored = self.deps.notification_repository.create(notification).await?;
        let senders = self.load_senders(std::slice::from_ref(&stored)).await?;
        Ok(self.to_dto(stored, &senders))
    }

    /// 发送者头像优先使用其公司徽标
    async fn load_senders(
        &self,
        notifications: &[Notification],
    ) -> Result<HashMap<UserId, User>, ApplicationError> {
        let mut senders = HashMap::new();
        for sender_id in notifications.iter().filter_map(|n| n.sender_id) {
            if senders.contains_key(&sender_id) {
                continue;
            }
            let Some(mut sender) = self.deps.user_repository.find_by_id(sender_id).await? else {
                continue;
            };
            if let Some(company_id) = sender.company_id {
                let logo = self
                    .deps
                    .company_repository
                    .find_by_id(company_id)
                    .await?
                    .and_then(|company| company.logo_url);
                if logo.is_some() {
                    sender.logo_url = logo;
                }
            }
            senders.insert(sender_id, sender);
        }
        Ok(senders)
    }

    fn to_dto(&self, notification: Notification, senders: &HashMap<UserId, User>) -> NotificationDto {
        let sender = notification.sender_id.and_then(|id| senders.get(&id));
        NotificationDto::new(notification, sender)
    }
}
