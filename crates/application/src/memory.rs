//! 内存实现（用于测试）
//!
//! `InMemoryDatabase` 用一把锁保护全部表，以便模拟外键级联；
//! 其余存储端口各有独立的内存实现。

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use domain::{
    ChatMessage, Company, CompanyId, Email, Job, JobId, JobLevel, JobStatus, Notification,
    NotificationId, Page, PageRequest, PasswordHash, Payment, PaymentStatus, Permission,
    PermissionId, RepositoryError, Resume, ResumeId, ResumeStatus, Role, RoleId, SessionKey,
    SessionMeta, Skill, SkillId, Subscriber, SubscriberId, Timestamp, User, UserId,
};
use tokio::sync::{Mutex, RwLock};

use crate::chat_cache::ChatHistoryCache;
use crate::error::ApplicationError;
use crate::llm::LlmClient;
use crate::mailer::{JobDigestItem, Mailer, ResumeStatusMail};
use crate::otp::OtpStore;
use crate::password::{PasswordHasher, PasswordHasherError};
use crate::repository::{
    ChatMessageRepository, CompanyRepository, JobFilter, JobRepository, NotificationRepository,
    PaymentRepository, PermissionRepository, ResumeRepository, RoleRepository, SkillRepository,
    SubscriberRepository, UserFilter, UserRepository,
};
use crate::session_store::RefreshTokenStore;
use crate::storage::FileStorage;
use crate::token::{SessionUser, TokenCodec, TokenKind, VerifiedToken};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    companies: HashMap<CompanyId, Company>,
    skills: HashMap<SkillId, Skill>,
    jobs: HashMap<JobId, Job>,
    resumes: HashMap<ResumeId, Resume>,
    notifications: HashMap<NotificationId, Notification>,
    payments: HashMap<String, Payment>,
    chat_messages: Vec<ChatMessage>,
    subscribers: HashMap<SubscriberId, Subscriber>,
}

impl Tables {
    /// 角色只保存权限引用，读取时按当前权限表解析
    fn resolve_role(&self, role: &Role) -> Role {
        let mut role = role.clone();
        role.permissions = role
            .permissions
            .iter()
            .filter_map(|p| self.permissions.get(&p.id).cloned())
            .collect();
        role
    }

    fn resolve_job(&self, job: &Job) -> Job {
        let mut job = job.clone();
        job.skills = job
            .skills
            .iter()
            .filter_map(|s| self.skills.get(&s.id).cloned())
            .collect();
        job
    }

    fn resolve_subscriber(&self, subscriber: &Subscriber) -> Subscriber {
        let mut subscriber = subscriber.clone();
        subscriber.skills = subscriber
            .skills
            .iter()
            .filter_map(|s| self.skills.get(&s.id).cloned())
            .collect();
        subscriber
    }

    fn remove_job_cascade(&mut self, job_id: JobId) {
        self.jobs.remove(&job_id);
        self.resumes.retain(|_, r| r.job_id != job_id);
        self.payments.retain(|_, p| p.job_id != job_id);
    }

    fn company_of_job(&self, job_id: JobId) -> Option<CompanyId> {
        self.jobs.get(&job_id).and_then(|job| job.company_id)
    }
}

/// 内存数据库，实现全部仓储接口。
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email.matches(user.email.as_str()))
        {
            return Err(RepositoryError::Conflict);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email.matches(user.email.as_str()))
        {
            return Err(RepositoryError::Conflict);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.resumes.retain(|_, r| r.user_id != id);
        tables.notifications.retain(|_, n| n.recipient_id != id);
        for notification in tables.notifications.values_mut() {
            if notification.sender_id == Some(id) {
                notification.sender_id = None;
            }
        }
        tables.payments.retain(|_, p| p.user_id != id);
        tables.chat_messages.retain(|m| m.user_id != id);
        for company in tables.companies.values_mut() {
            if company.owner_id == Some(id) {
                company.owner_id = None;
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.matches(email.as_str()))
            .cloned())
    }

    async fn list(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| filter.name.as_deref().is_none_or(|n| contains_ci(&u.name, n)))
            .filter(|u| {
                filter
                    .email
                    .as_deref()
                    .is_none_or(|e| contains_ci(u.email.as_str(), e))
            })
            .cloned()
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(Page::slice(users, page))
    }

    async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.company_id == Some(company_id))
            .cloned()
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn list_by_role_name(&self, role_name: &str) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        let role_ids: HashSet<RoleId> = tables
            .roles
            .values()
            .filter(|r| r.is(role_name))
            .map(|r| r.id)
            .collect();
        Ok(tables
            .users
            .values()
            .filter(|u| u.role_id.is_some_and(|id| role_ids.contains(&id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleRepository for InMemoryDatabase {
    async fn create(&self, role: Role) -> Result<Role, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.roles.values().any(|r| r.is(&role.name)) {
            return Err(RepositoryError::Conflict);
        }
        tables.roles.insert(role.id, role.clone());
        Ok(tables.resolve_role(&role))
    }

    async fn update(&self, role: Role) -> Result<Role, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&role.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .roles
            .values()
            .any(|r| r.id != role.id && r.is(&role.name))
        {
            return Err(RepositoryError::Conflict);
        }
        tables.roles.insert(role.id, role.clone());
        Ok(tables.resolve_role(&role))
    }

    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.roles.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for user in tables.users.values_mut() {
            if user.role_id == Some(id) {
                user.role_id = None;
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).map(|r| tables.resolve_role(r)))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .values()
            .find(|r| r.is(name))
            .map(|r| tables.resolve_role(r)))
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Role>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables.roles.values().map(|r| tables.resolve_role(r)).collect();
        roles.sort_by_key(|r| (r.created_at, r.id));
        Ok(Page::slice(roles, page))
    }
}

#[async_trait]
impl PermissionRepository for InMemoryDatabase {
    async fn create(&self, permission: Permission) -> Result<Permission, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .permissions
            .values()
            .any(|p| p.method == permission.method && p.api_path == permission.api_path)
        {
            return Err(RepositoryError::Conflict);
        }
        tables.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn update(&self, permission: Permission) -> Result<Permission, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.permissions.contains_key(&permission.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.permissions.values().any(|p| {
            p.id != permission.id
                && p.method == permission.method
                && p.api_path == permission.api_path
        }) {
            return Err(RepositoryError::Conflict);
        }
        tables.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn delete(&self, id: PermissionId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.permissions.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for role in tables.roles.values_mut() {
            role.permissions.retain(|p| p.id != id);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: PermissionId) -> Result<Option<Permission>, RepositoryError> {
        Ok(self.tables.read().await.permissions.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.permissions.get(id).cloned())
            .collect())
    }

    async fn find_by_method_and_path(
        &self,
        method: &str,
        api_path: &str,
    ) -> Result<Option<Permission>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .find(|p| p.method.eq_ignore_ascii_case(method) && p.api_path == api_path)
            .cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Permission>, RepositoryError> {
        Ok(Page::slice(PermissionRepository::list_all(self).await?, page))
    }

    async fn list_all(&self) -> Result<Vec<Permission>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut permissions: Vec<Permission> = tables.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| {
            (&a.module, &a.api_path, &a.method).cmp(&(&b.module, &b.api_path, &b.method))
        });
        Ok(permissions)
    }
}

#[async_trait]
impl CompanyRepository for InMemoryDatabase {
    async fn create(&self, company: Company) -> Result<Company, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn update(&self, company: Company) -> Result<Company, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.companies.contains_key(&company.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn delete(&self, id: CompanyId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.companies.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for user in tables.users.values_mut() {
            if user.company_id == Some(id) {
                user.company_id = None;
            }
        }
        let job_ids: Vec<JobId> = tables
            .jobs
            .values()
            .filter(|j| j.company_id == Some(id))
            .map(|j| j.id)
            .collect();
        for job_id in job_ids {
            tables.remove_job_cascade(job_id);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self.tables.read().await.companies.get(&id).cloned())
    }

    async fn list(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Company>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut companies: Vec<Company> = tables
            .companies
            .values()
            .filter(|c| name.is_none_or(|n| contains_ci(&c.name, n)))
            .cloned()
            .collect();
        companies.sort_by_key(|c| (c.created_at, c.id));
        Ok(Page::slice(companies, page))
    }

    async fn list_with_job_counts(&self) -> Result<Vec<(Company, u64)>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut result: Vec<(Company, u64)> = tables
            .companies
            .values()
            .map(|c| {
                let count = tables
                    .jobs
                    .values()
                    .filter(|j| j.company_id == Some(c.id))
                    .count() as u64;
                (c.clone(), count)
            })
            .collect();
        result.sort_by_key(|(c, _)| (c.created_at, c.id));
        Ok(result)
    }
}

#[async_trait]
impl SkillRepository for InMemoryDatabase {
    async fn create(&self, skill: Skill) -> Result<Skill, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .skills
            .values()
            .any(|s| s.name.eq_ignore_ascii_case(&skill.name))
        {
            return Err(RepositoryError::Conflict);
        }
        tables.skills.insert(skill.id, skill.clone());
        Ok(skill)
    }

    async fn update(&self, skill: Skill) -> Result<Skill, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.skills.contains_key(&skill.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .skills
            .values()
            .any(|s| s.id != skill.id && s.name.eq_ignore_ascii_case(&skill.name))
        {
            return Err(RepositoryError::Conflict);
        }
        tables.skills.insert(skill.id, skill.clone());
        Ok(skill)
    }

    async fn delete(&self, id: SkillId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.skills.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for job in tables.jobs.values_mut() {
            job.skills.retain(|s| s.id != id);
        }
        for subscriber in tables.subscribers.values_mut() {
            subscriber.skills.retain(|s| s.id != id);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError> {
        Ok(self.tables.read().await.skills.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Skill>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .skills
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[SkillId]) -> Result<Vec<Skill>, RepositoryError> {
        let tables = self.tables.read().await;
        let unique: HashSet<&SkillId> = ids.iter().collect();
        let mut skills: Vec<Skill> = unique
            .into_iter()
            .filter_map(|id| tables.skills.get(id).cloned())
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    async fn list(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Skill>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut skills: Vec<Skill> = tables
            .skills
            .values()
            .filter(|s| name.is_none_or(|n| contains_ci(&s.name, n)))
            .cloned()
            .collect();
        skills.sort_by_key(|s| (s.created_at, s.id));
        Ok(Page::slice(skills, page))
    }
}

#[async_trait]
impl JobRepository for InMemoryDatabase {
    async fn create(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.jobs.insert(job.id, job.clone());
        Ok(tables.resolve_job(&job))
    }

    async fn update(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.jobs.contains_key(&job.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(tables.resolve_job(&job))
    }

    async fn delete(&self, id: JobId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.jobs.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.remove_job_cascade(id);
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.get(&id).map(|j| tables.resolve_job(j)))
    }

    async fn list(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<Job>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| filter.name.as_deref().is_none_or(|n| contains_ci(&j.name, n)))
            .filter(|j| {
                filter
                    .location
                    .as_deref()
                    .is_none_or(|l| contains_ci(&j.location, l))
            })
            .filter(|j| filter.level.is_none_or(|level| j.level == level))
            .map(|j| tables.resolve_job(j))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::slice(jobs, page))
    }

    async fn list_by_company(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<Page<Job>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.company_id == Some(company_id))
            .map(|j| tables.resolve_job(j))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::slice(jobs, page))
    }

    async fn count_by_level(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<(JobLevel, u64)>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<JobLevel, u64> = HashMap::new();
        for job in tables
            .jobs
            .values()
            .filter(|j| company_id.is_none() || j.company_id == company_id)
        {
            *counts.entry(job.level).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn expire_overdue(&self, now: Timestamp) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let mut affected = 0;
        for job in tables.jobs.values_mut() {
            if job.status == JobStatus::Active && job.end_date < now {
                job.status = JobStatus::Expired;
                job.updated_at = now;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn latest_by_skills(
        &self,
        skill_ids: &[SkillId],
        limit: i64,
    ) -> Result<Vec<Job>, RepositoryError> {
        let tables = self.tables.read().await;
        let wanted: HashSet<&SkillId> = skill_ids.iter().collect();
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.skills.iter().any(|s| wanted.contains(&s.id)))
            .map(|j| tables.resolve_job(j))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }
}

fn newest_first(resumes: &mut [Resume]) {
    resumes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl ResumeRepository for InMemoryDatabase {
    async fn create(&self, resume: Resume) -> Result<Resume, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .resumes
            .values()
            .any(|r| r.user_id == resume.user_id && r.job_id == resume.job_id)
        {
            return Err(RepositoryError::Conflict);
        }
        tables.resumes.insert(resume.id, resume.clone());
        Ok(resume)
    }

    async fn update(&self, resume: Resume) -> Result<Resume, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.resumes.contains_key(&resume.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.resumes.insert(resume.id, resume.clone());
        Ok(resume)
    }

    async fn delete(&self, id: ResumeId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .resumes
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: ResumeId) -> Result<Option<Resume>, RepositoryError> {
        Ok(self.tables.read().await.resumes.get(&id).cloned())
    }

    async fn find_by_user_and_job(
        &self,
        user_id: UserId,
        job_id: JobId,
    ) -> Result<Option<Resume>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .resumes
            .values()
            .find(|r| r.user_id == user_id && r.job_id == job_id)
            .cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Resume>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut resumes: Vec<Resume> = tables.resumes.values().cloned().collect();
        newest_first(&mut resumes);
        Ok(Page::slice(resumes, page))
    }

    async fn list_by_company(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<Page<Resume>, RepositoryError> {
        Ok(Page::slice(
            ResumeRepository::list_all_by_company(self, company_id).await?,
            page,
        ))
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Resume>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut resumes: Vec<Resume> = tables
            .resumes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut resumes);
        Ok(Page::slice(resumes, page))
    }

    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<Resume>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut resumes: Vec<Resume> = tables
            .resumes
            .values()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect();
        newest_first(&mut resumes);
        Ok(resumes)
    }

    async fn list_all_by_user(&self, user_id: UserId) -> Result<Vec<Resume>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut resumes: Vec<Resume> = tables
            .resumes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut resumes);
        Ok(resumes)
    }

    async fn list_all_by_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<Resume>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut resumes: Vec<Resume> = tables
            .resumes
            .values()
            .filter(|r| tables.company_of_job(r.job_id) == Some(company_id))
            .cloned()
            .collect();
        newest_first(&mut resumes);
        Ok(resumes)
    }

    async fn count_by_job(&self, job_id: JobId) -> Result<u64, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.resumes.values().filter(|r| r.job_id == job_id).count() as u64)
    }

    async fn count_by_status(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<(ResumeStatus, u64)>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<ResumeStatus, u64> = HashMap::new();
        for resume in tables
            .resumes
            .values()
            .filter(|r| company_id.is_none() || tables.company_of_job(r.job_id) == company_id)
        {
            *counts.entry(resume.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryDatabase {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.tables.read().await.notifications.get(&id).cloned())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let notification = tables
            .notifications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let mut affected = 0;
        for notification in tables
            .notifications
            .values_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            notification.is_read = true;
            affected += 1;
        }
        Ok(affected)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Notification>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::slice(notifications, page))
    }

    async fn count_unread(&self, recipient_id: UserId) -> Result<u64, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as u64)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryDatabase {
    async fn create(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.payments.contains_key(&payment.order_id) {
            return Err(RepositoryError::Conflict);
        }
        tables
            .payments
            .insert(payment.order_id.clone(), payment.clone());
        Ok(payment)
    }

    async fn update(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.payments.contains_key(&payment.order_id) {
            return Err(RepositoryError::NotFound);
        }
        tables
            .payments
            .insert(payment.order_id.clone(), payment.clone());
        Ok(payment)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.tables.read().await.payments.get(order_id).cloned())
    }

    async fn has_successful_payment(
        &self,
        user_id: UserId,
        job_id: JobId,
    ) -> Result<bool, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.payments.values().any(|p| {
            p.user_id == user_id && p.job_id == job_id && p.status == PaymentStatus::Success
        }))
    }
}

#[async_trait]
impl ChatMessageRepository for InMemoryDatabase {
    async fn create(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.chat_messages.push(message.clone());
        Ok(message)
    }

    async fn list_by_session(
        &self,
        user_id: UserId,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let tables = self.tables.read().await;
        let messages: Vec<ChatMessage> = tables
            .chat_messages
            .iter()
            .filter(|m| m.user_id == user_id && m.session_id == session_id)
            .cloned()
            .collect();
        let skip = messages.len().saturating_sub(limit.max(0) as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .chat_messages
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_by_session(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<u64, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .chat_messages
            .iter()
            .filter(|m| m.user_id == user_id && m.session_id == session_id)
            .count() as u64)
    }

    async fn delete_session(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.chat_messages.len();
        tables
            .chat_messages
            .retain(|m| !(m.user_id == user_id && m.session_id == session_id));
        Ok((before - tables.chat_messages.len()) as u64)
    }
}

#[async_trait]
impl SubscriberRepository for InMemoryDatabase {
    async fn create(&self, subscriber: Subscriber) -> Result<Subscriber, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .subscribers
            .values()
            .any(|s| s.email.matches(subscriber.email.as_str()))
        {
            return Err(RepositoryError::Conflict);
        }
        tables.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(tables.resolve_subscriber(&subscriber))
    }

    async fn update(&self, subscriber: Subscriber) -> Result<Subscriber, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.subscribers.contains_key(&subscriber.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(tables.resolve_subscriber(&subscriber))
    }

    async fn delete(&self, id: SubscriberId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .subscribers
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscribers
            .values()
            .find(|s| s.email.matches(email.as_str()))
            .map(|s| tables.resolve_subscriber(s)))
    }

    async fn list_all(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut subscribers: Vec<Subscriber> = tables
            .subscribers
            .values()
            .map(|s| tables.resolve_subscriber(s))
            .collect();
        subscribers.sort_by_key(|s| (s.created_at, s.id));
        Ok(subscribers)
    }
}

/// 明文前缀的“哈希”，仅用于测试。
#[derive(Debug, Default)]
pub struct PlainPasswordHasher;

#[async_trait]
impl PasswordHasher for PlainPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        PasswordHash::new(format!("plain:{plaintext}"))
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        Ok(hashed.as_str() == format!("plain:{plaintext}"))
    }
}

/// 内存刷新令牌存储，忽略 TTL。
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    sessions: RwLock<HashMap<String, SessionMeta>>,
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn save(
        &self,
        key: &SessionKey,
        meta: &SessionMeta,
        _ttl_secs: u64,
    ) -> Result<(), ApplicationError> {
        self.sessions
            .write()
            .await
            .insert(key.as_str().to_owned(), meta.clone());
        Ok(())
    }

    async fn exists(&self, key: &SessionKey) -> Result<bool, ApplicationError> {
        Ok(self.sessions.read().await.contains_key(key.as_str()))
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), ApplicationError> {
        self.sessions.write().await.remove(key.as_str());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(SessionKey, SessionMeta)>, ApplicationError> {
        let owner = user_id.to_string();
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .map(|(raw, meta)| (SessionKey::from_raw(raw.clone()), meta.clone()))
            .filter(|(key, _)| key.owner() == Some(owner.as_str()))
            .collect())
    }
}

/// 内存 OTP 存储，忽略 TTL。
#[derive(Default)]
pub struct MemoryOtpStore {
    otps: RwLock<HashMap<String, String>>,
    attempts: RwLock<HashMap<String, u32>>,
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn save_otp(
        &self,
        email: &str,
        otp: &str,
        _ttl: Duration,
    ) -> Result<(), ApplicationError> {
        self.otps
            .write()
            .await
            .insert(email.to_owned(), otp.to_owned());
        Ok(())
    }

    async fn get_otp(&self, email: &str) -> Result<Option<String>, ApplicationError> {
        Ok(self.otps.read().await.get(email).cloned())
    }

    async fn delete_otp(&self, email: &str) -> Result<(), ApplicationError> {
        self.otps.write().await.remove(email);
        Ok(())
    }

    async fn send_attempts(&self, email: &str) -> Result<u32, ApplicationError> {
        Ok(self.attempts.read().await.get(email).copied().unwrap_or(0))
    }

    async fn increment_attempts(
        &self,
        email: &str,
        _window: Duration,
    ) -> Result<u32, ApplicationError> {
        let mut attempts = self.attempts.write().await;
        let count = attempts.entry(email.to_owned()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn reset_attempts(&self, email: &str) -> Result<(), ApplicationError> {
        self.attempts.write().await.remove(email);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryChatHistoryCache {
    entries: RwLock<HashMap<(UserId, String), Vec<ChatMessage>>>,
}

#[async_trait]
impl ChatHistoryCache for MemoryChatHistoryCache {
    async fn load(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<Option<Vec<ChatMessage>>, ApplicationError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(user_id, session_id.to_owned())).cloned())
    }

    async fn store(
        &self,
        user_id: UserId,
        session_id: &str,
        messages: &[ChatMessage],
    ) -> Result<(), ApplicationError> {
        self.entries
            .write()
            .await
            .insert((user_id, session_id.to_owned()), messages.to_vec());
        Ok(())
    }

    async fn append(
        &self,
        user_id: UserId,
        session_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApplicationError> {
        self.entries
            .write()
            .await
            .entry((user_id, session_id.to_owned()))
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn clear(&self, user_id: UserId, session_id: &str) -> Result<(), ApplicationError> {
        self.entries
            .write()
            .await
            .remove(&(user_id, session_id.to_owned()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFileStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStorage {
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ApplicationError> {
        self.files.write().await.insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApplicationError> {
        self.files.write().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}

/// 记录已发送邮件，不做真实投递。
#[derive(Debug, Clone, PartialEq)]
pub enum SentMail {
    Otp { to: String, otp: String },
    Digest { to: String, jobs: Vec<JobDigestItem> },
    ResumeStatus(ResumeStatusMail),
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    /// 最近一次发给该邮箱的 OTP
    pub async fn last_otp(&self, email: &str) -> Option<String> {
        self.sent.lock().await.iter().rev().find_map(|mail| match mail {
            SentMail::Otp { to, otp } if to.eq_ignore_ascii_case(email) => Some(otp.clone()),
            _ => None,
        })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_otp(&self, to: &Email, _name: &str, otp: &str) -> Result<(), ApplicationError> {
        self.sent.lock().await.push(SentMail::Otp {
            to: to.as_str().to_owned(),
            otp: otp.to_owned(),
        });
        Ok(())
    }

    async fn send_job_digest(
        &self,
        to: &Email,
        _name: &str,
        jobs: &[JobDigestItem],
    ) -> Result<(), ApplicationError> {
        self.sent.lock().await.push(SentMail::Digest {
            to: to.as_str().to_owned(),
            jobs: jobs.to_vec(),
        });
        Ok(())
    }

    async fn send_resume_status(&self, mail: &ResumeStatusMail) -> Result<(), ApplicationError> {
        self.sent
            .lock()
            .await
            .push(SentMail::ResumeStatus(mail.clone()));
        Ok(())
    }
}

/// 固定回答的大模型，记录收到的提示词。
pub struct CannedLlm {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl CannedLlm {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LlmClient for CannedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, ApplicationError> {
        self.prompts.lock().await.push(prompt.to_owned());
        Ok(self.answer.clone())
    }
}

/// 不签名的令牌实现：签发时登记，校验时查表。
pub struct FakeTokenCodec {
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    issued: std::sync::Mutex<HashMap<String, VerifiedToken>>,
}

impl Default for FakeTokenCodec {
    fn default() -> Self {
        Self {
            access_ttl_secs: 900,
            refresh_ttl_secs: 86_400,
            issued: std::sync::Mutex::new(HashMap::new()),
        }
    }
}

impl FakeTokenCodec {
    /// 模拟令牌过期或被篡改
    pub fn revoke(&self, token: &str) {
        if let Ok(mut issued) = self.issued.lock() {
            issued.remove(token);
        }
    }
}

impl TokenCodec for FakeTokenCodec {
    fn issue(
        &self,
        user: &SessionUser,
        kind: TokenKind,
    ) -> Result<String, ApplicationError> {
        let token = format!("{kind:?}.{}", uuid::Uuid::new_v4().simple()).to_lowercase();
        let verified = VerifiedToken {
            subject: user.email.clone(),
            user: user.clone(),
            permissions: user.permissions.clone(),
            expires_at: self.ttl_secs(kind),
        };
        self.issued
            .lock()
            .map_err(|_| ApplicationError::infrastructure("token table poisoned"))?
            .insert(token.clone(), verified);
        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<VerifiedToken, ApplicationError> {
        self.issued
            .lock()
            .map_err(|_| ApplicationError::infrastructure("token table poisoned"))?
            .get(token)
            .cloned()
            .ok_or(ApplicationError::InvalidToken)
    }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }
}
