//! 职位订阅与每日推荐邮件

use std::collections::HashMap;
use std::sync::Arc;

use domain::{Company, CompanyId, Email, Job, Skill, SkillId, Subscriber, SubscriberId, UserId};
use tracing::{error, info, warn};

use crate::{
    clock::Clock,
    dto::{DigestReport, SubscriberDto},
    error::ApplicationError,
    mailer::{JobDigestItem, Mailer},
    repository::{
        CompanyRepository, JobRepository, SkillRepository, SubscriberRepository, UserRepository,
    },
};

use super::require_user;

/// 每封推荐邮件最多包含的职位数
pub const DIGEST_JOB_LIMIT: i64 = 3;

#[derive(Debug, Clone, Default)]
pub struct SubscriberRequest {
    pub name: String,
    pub skill_ids: Vec<SkillId>,
}

pub struct SubscriberServiceDependencies {
    pub subscriber_repository: Arc<dyn SubscriberRepository>,
    pub skill_repository: Arc<dyn SkillRepository>,
    pub job_repository: Arc<dyn JobRepository>,
    pub company_repository: Arc<dyn CompanyRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

pub struct SubscriberService {
    deps: SubscriberServiceDependencies,
}

impl SubscriberService {
    pub fn new(deps: SubscriberServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_self(
        &self,
        user_id: UserId,
        request: SubscriberRequest,
    ) -> Result<SubscriberDto, ApplicationError> {
        let email = self.user_email(user_id).await?;
        if self
            .deps
            .subscriber_repository
            .find_by_email(&email)
            .await?
            .is_some()
        {
            return Err(ApplicationError::already_exists("subscriber", email.as_str()));
        }

        let skills = self.resolve_skills(&request.skill_ids).await?;
        let subscriber = Subscriber::new(
            SubscriberId::generate(),
            request.name,
            email,
            skills,
            self.deps.clock.now(),
        )?;
        let subscriber = self.deps.subscriber_repository.create(subscriber).await?;
        info!(subscriber_id = %subscriber.id, email = %subscriber.email, "订阅职位推荐");
        Ok(SubscriberDto::from(&subscriber))
    }

    pub async fn get_self(&self, user_id: UserId) -> Result<SubscriberDto, ApplicationError> {
        let subscriber = self.require_self(user_id).await?;
        Ok(SubscriberDto::from(&subscriber))
    }

    pub async fn update_self(
        &self,
        user_id: UserId,
        request: SubscriberRequest,
    ) -> Result<SubscriberDto, ApplicationError> {
        let mut subscriber = self.require_self(user_id).await?;
        let skills = self.resolve_skills(&request.skill_ids).await?;
        subscriber.update(request.name, skills, self.deps.clock.now())?;
        let subscriber = self.deps.subscriber_repository.update(subscriber).await?;
        Ok(SubscriberDto::from(&subscriber))
    }

    pub async fn delete_self(&self, user_id: UserId) -> Result<(), ApplicationError> {
        let subscriber = self.require_self(user_id).await?;
        self.deps.subscriber_repository.delete(subscriber.id).await?;
        info!(subscriber_id = %subscriber.id, "取消职位订阅");
        Ok(())
    }

    /// 向所有订阅者发送推荐邮件；单个订阅者失败不影响其余发送
    pub async fn send_daily_digest(&self) -> Result<DigestReport, ApplicationError> {
        let subscribers = self.deps.subscriber_repository.list_all().await?;
        let mut report = DigestReport::default();
        let mut companies = HashMap::new();

        for subscriber in &subscribers {
            match self.send_digest(subscriber, &mut companies).await {
                Ok(true) => report.sent += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => {
                    error!(email = %subscriber.email, error = %err, "发送职位推荐邮件失败");
                    report.failed += 1;
                }
            }
        }

        info!(
            total = subscribers.len(),
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "每日职位推荐发送完成"
        );
        Ok(report)
    }

    /// 手动向指定订阅者发送一次推荐，返回是否实际发出
    pub async fn send_to(&self, email: &str) -> Result<bool, ApplicationError> {
        let email = Email::parse(email)?;
        let subscriber = self
            .deps
            .subscriber_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApplicationError::not_found("subscriber", email.as_str()))?;
        self.send_digest(&subscriber, &mut HashMap::new()).await
    }

    async fn send_digest(
        &self,
        subscriber: &Subscriber,
        companies: &mut HashMap<CompanyId, Option<Company>>,
    ) -> Result<bool, ApplicationError> {
        if subscriber.skills.is_empty() {
            return Ok(false);
        }
        let skill_ids: Vec<SkillId> = subscriber.skills.iter().map(|skill| skill.id).collect();
        let jobs = self
            .deps
            .job_repository
            .latest_by_skills(&skill_ids, DIGEST_JOB_LIMIT)
            .await?;
        if jobs.is_empty() {
            return Ok(false);
        }

        let mut items = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let company_name = match job.company_id {
                Some(company_id) => self
                    .company(company_id, companies)
                    .await?
                    .map(|company| company.name),
                None => None,
            };
            items.push(digest_item(job, company_name));
        }

        self.deps
            .mailer
            .send_job_digest(&subscriber.email, &subscriber.name, &items)
            .await?;
        info!(email = %subscriber.email, jobs = items.len(), "已发送职位推荐");
        Ok(true)
    }

    async fn company(
        &self,
        id: CompanyId,
        cache: &mut HashMap<CompanyId, Option<Company>>,
    ) -> Result<Option<Company>, ApplicationError> {
        if let Some(company) = cache.get(&id) {
            return Ok(company.clone());
        }
        let company = self.deps.company_repository.find_by_id(id).await?;
        if company.is_none() {
            warn!(company_id = %id, "职位关联的公司不存在");
        }
        cache.insert(id, company.clone());
        Ok(company)
    }

    async fn require_self(&self, user_id: UserId) -> Result<Subscriber, ApplicationError> {
        let email = self.user_email(user_id).await?;
        self.deps
            .subscriber_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApplicationError::not_found("subscriber", email.as_str()))
    }

    async fn user_email(&self, user_id: UserId) -> Result<Email, ApplicationError> {
        Ok(require_user(self.deps.user_repository.as_ref(), user_id)
            .await?
            .email)
    }

    async fn resolve_skills(&self, ids: &[SkillId]) -> Result<Vec<Skill>, ApplicationError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let skills = self.deps.skill_repository.find_by_ids(ids).await?;
        if ids.iter().any(|id| !skills.iter().any(|s| s.id == *id)) {
            return Err(ApplicationError::invalid_argument(
                "skills",
                "one or more skills do not exist",
            ));
        }
        Ok(skills)
    }
}

fn digest_item(job: &Job, company_name: Option<String>) -> JobDigestItem {
    JobDigestItem {
        id: job.id,
        name: job.name.clone(),
        company_name,
        location: job.location.clone(),
        salary: job.salary,
        level: job.level,
        skills: job.skills.iter().map(|skill| skill.name.clone()).collect(),
    }
}
