use async_trait::async_trait;
use domain::{
    ChatMessage, Company, CompanyId, Email, Job, JobId, JobLevel, Notification, NotificationId,
    Page, PageRequest, Payment, Permission, PermissionId, RepositoryError, Resume, ResumeId,
    ResumeStatus, Role, RoleId, Skill, SkillId, Subscriber, SubscriberId, Timestamp, User, UserId,
};

/// 用户列表过滤条件，均为子串匹配（不区分大小写）。
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub name: Option<String>,
    pub location: Option<String>,
    pub level: Option<JobLevel>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    /// 级联删除该用户的投递、通知、支付与对话记录
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    /// 邮箱比较不区分大小写
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;
    async fn list(&self, filter: &UserFilter, page: PageRequest)
        -> Result<Page<User>, RepositoryError>;
    async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<User>, RepositoryError>;
    async fn list_by_role_name(&self, role_name: &str) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, role: Role) -> Result<Role, RepositoryError>;
    async fn update(&self, role: Role) -> Result<Role, RepositoryError>;
    /// 删除角色，持有该角色的用户 role_id 置空
    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError>;
    async fn list(&self, page: PageRequest) -> Result<Page<Role>, RepositoryError>;
}

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn create(&self, permission: Permission) -> Result<Permission, RepositoryError>;
    async fn update(&self, permission: Permission) -> Result<Permission, RepositoryError>;
    /// 删除权限并从所有角色中移除
    async fn delete(&self, id: PermissionId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: PermissionId) -> Result<Option<Permission>, RepositoryError>;
    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, RepositoryError>;
    async fn find_by_method_and_path(
        &self,
        method: &str,
        api_path: &str,
    ) -> Result<Option<Permission>, RepositoryError>;
    async fn list(&self, page: PageRequest) -> Result<Page<Permission>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Permission>, RepositoryError>;
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create(&self, company: Company) -> Result<Company, RepositoryError>;
    async fn update(&self, company: Company) -> Result<Company, RepositoryError>;
    /// 删除公司：成员解绑，职位及其投递一并删除
    async fn delete(&self, id: CompanyId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError>;
    async fn list(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Company>, RepositoryError>;
    async fn list_with_job_counts(&self) -> Result<Vec<(Company, u64)>, RepositoryError>;
}

#[async_trait]
pub trait SkillRepository: Send + Sync {
    async fn create(&self, skill: Skill) -> Result<Skill, RepositoryError>;
    async fn update(&self, skill: Skill) -> Result<Skill, RepositoryError>;
    /// 删除技能并从职位、订阅者中移除
    async fn delete(&self, id: SkillId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Skill>, RepositoryError>;
    async fn find_by_ids(&self, ids: &[SkillId]) -> Result<Vec<Skill>, RepositoryError>;
    async fn list(&self, name: Option<&str>, page: PageRequest)
        -> Result<Page<Skill>, RepositoryError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: Job) -> Result<Job, RepositoryError>;
    async fn update(&self, job: Job) -> Result<Job, RepositoryError>;
    /// 删除职位及其投递记录
    async fn delete(&self, id: JobId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;
    async fn list(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<Job>, RepositoryError>;
    async fn list_by_company(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<Page<Job>, RepositoryError>;
    async fn count_by_level(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<(JobLevel, u64)>, RepositoryError>;
    /// 将截止日期早于 `now` 的 ACTIVE 职位标记为 EXPIRED，返回受影响数量
    async fn expire_overdue(&self, now: Timestamp) -> Result<u64, RepositoryError>;
    /// 按创建时间倒序，取与任一技能匹配的职位
    async fn latest_by_skills(
        &self,
        skill_ids: &[SkillId],
        limit: i64,
    ) -> Result<Vec<Job>, RepositoryError>;
}

#[async_trait]
pub trait ResumeRepository: Send + Sync {
    async fn create(&self, resume: Resume) -> Result<Resume, RepositoryError>;
    async fn update(&self, resume: Resume) -> Result<Resume, RepositoryError>;
    async fn delete(&self, id: ResumeId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: ResumeId) -> Result<Option<Resume>, RepositoryError>;
    async fn find_by_user_and_job(
        &self,
        user_id: UserId,
        job_id: JobId,
    ) -> Result<Option<Resume>, RepositoryError>;
    async fn list(&self, page: PageRequest) -> Result<Page<Resume>, RepositoryError>;
    async fn list_by_company(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<Page<Resume>, RepositoryError>;
    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Resume>, RepositoryError>;
    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<Resume>, RepositoryError>;
    async fn list_all_by_user(&self, user_id: UserId) -> Result<Vec<Resume>, RepositoryError>;
    async fn list_all_by_company(&self, company_id: CompanyId)
        -> Result<Vec<Resume>, RepositoryError>;
    async fn count_by_job(&self, job_id: JobId) -> Result<u64, RepositoryError>;
    async fn count_by_status(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<(ResumeStatus, u64)>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError>;
    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError>;
    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError>;
    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64, RepositoryError>;
    /// 按创建时间倒序
    async fn list_for_recipient(
        &self,
        recipient_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Notification>, RepositoryError>;
    async fn count_unread(&self, recipient_id: UserId) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment, RepositoryError>;
    async fn update(&self, payment: Payment) -> Result<Payment, RepositoryError>;
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, RepositoryError>;
    async fn has_successful_payment(
        &self,
        user_id: UserId,
        job_id: JobId,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    async fn create(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError>;
    /// 按时间正序返回会话中最近的 `limit` 条消息
    async fn list_by_session(
        &self,
        user_id: UserId,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
    /// 按时间正序返回用户的全部消息
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ChatMessage>, RepositoryError>;
    async fn count_by_session(&self, user_id: UserId, session_id: &str)
        -> Result<u64, RepositoryError>;
    async fn delete_session(&self, user_id: UserId, session_id: &str)
        -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn create(&self, subscriber: Subscriber) -> Result<Subscriber, RepositoryError>;
    async fn update(&self, subscriber: Subscriber) -> Result<Subscriber, RepositoryError>;
    async fn delete(&self, id: SubscriberId) -> Result<(), RepositoryError>;
    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Subscriber>, RepositoryError>;
}
