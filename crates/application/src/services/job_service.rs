use std::collections::{hash_map::Entry, HashMap};
use std::sync::Arc;

use domain::{
    CompanyId, Job, JobDetails, JobId, JobLevel, Page, PageRequest, Skill, SkillId, UserId,
};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    dto::{JobDto, LevelCountDto},
    error::ApplicationError,
    repository::{
        CompanyRepository, JobFilter, JobRepository, ResumeRepository, SkillRepository,
        UserRepository,
    },
    storage::FileStorage,
};

use super::{recruiter_company_id, require_company, Scope};

#[derive(Debug, Clone)]
pub struct JobRequest {
    pub details: JobDetails,
    /// 仅管理员可指定，招聘者一律落在自己的公司
    pub company_id: Option<CompanyId>,
    pub skill_ids: Vec<SkillId>,
}

pub struct JobServiceDependencies {
    pub job_repository: Arc<dyn JobRepository>,
    pub company_repository: Arc<dyn CompanyRepository>,
    pub skill_repository: Arc<dyn SkillRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub resume_repository: Arc<dyn ResumeRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub clock: Arc<dyn Clock>,
}

pub struct JobService {
    deps: JobServiceDependencies,
}

impl JobService {
    pub fn new(deps: JobServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn list(
        &self,
        filter: JobFilter,
        page: PageRequest,
    ) -> Result<Page<JobDto>, ApplicationError> {
        let jobs = self.deps.job_repository.list(&filter, page).await?;
        self.to_page(jobs).await
    }

    pub async fn get(&self, id: JobId) -> Result<JobDto, ApplicationError> {
        let job = self.require_job(id).await?;
        self.to_dto(&job).await
    }

    pub async fn list_by_company(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<Page<JobDto>, ApplicationError> {
        let jobs = self
            .deps
            .job_repository
            .list_by_company(company_id, page)
            .await?;
        self.to_page(jobs).await
    }

    pub async fn list_for_recruiter(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<JobDto>, ApplicationError> {
        let company_id = recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?;
        self.list_by_company(company_id, page).await
    }

    pub async fn create(
        &self,
        request: JobRequest,
        scope: Scope,
    ) -> Result<JobDto, ApplicationError> {
        let company_id = match scope {
            Scope::Recruiter(user_id) => {
                Some(recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?)
            }
            Scope::Admin => match request.company_id {
                Some(id) => {
                    Some(require_company(self.deps.company_repository.as_ref(), id).await?.id)
                }
                None => None,
            },
        };
        let skills = self.resolve_skills(&request.skill_ids).await?;

        let job = Job::new(
            JobId::generate(),
            request.details,
            company_id,
            skills,
            self.deps.clock.now(),
        )?;
        let stored = self.deps.job_repository.create(job).await?;
        info!(job_id = %stored.id, company_id = ?stored.company_id, "创建职位");
        self.to_dto(&stored).await
    }

    pub async fn update(
        &self,
        id: JobId,
        request: JobRequest,
        scope: Scope,
    ) -> Result<JobDto, ApplicationError> {
        let mut job = self.require_job(id).await?;
        self.ensure_scope(&job, scope).await?;

        if let (Scope::Admin, Some(company_id)) = (scope, request.company_id) {
            require_company(self.deps.company_repository.as_ref(), company_id).await?;
            job.company_id = Some(company_id);
        }
        let skills = self.resolve_skills(&request.skill_ids).await?;
        job.update(request.details, skills, self.deps.clock.now())?;

        let stored = self.deps.job_repository.update(job).await?;
        self.to_dto(&stored).await
    }

    /// 删除职位及其投递，简历文件一并清理
    pub async fn delete(&self, id: JobId, scope: Scope) -> Result<JobDto, ApplicationError> {
        let job = self.require_job(id).await?;
        self.ensure_scope(&job, scope).await?;
        let dto = self.to_dto(&job).await?;
        let resumes = self.deps.resume_repository.list_by_job(id).await?;

        self.deps.job_repository.delete(id).await?;
        for resume in resumes {
            if let Err(err) = self.deps.file_storage.delete(&resume.file_key).await {
                warn!(error = %err, key = %resume.file_key, "删除简历文件失败");
            }
        }
        info!(job_id = %id, "删除职位");
        Ok(dto)
    }

    /// 各级别职位数量，没有职位的级别计 0
    pub async fn count_by_level(
        &self,
        scope: Scope,
    ) -> Result<Vec<LevelCountDto>, ApplicationError> {
        let company_id = match scope {
            Scope::Admin => None,
            Scope::Recruiter(user_id) => {
                Some(recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?)
            }
        };
        let counts: HashMap<JobLevel, u64> = self
            .deps
            .job_repository
            .count_by_level(company_id)
            .await?
            .into_iter()
            .collect();
        Ok(JobLevel::ALL
            .iter()
            .map(|level| LevelCountDto {
                level: *level,
                count: counts.get(level).copied().unwrap_or(0),
            })
            .collect())
    }

    /// 定时任务：把截止日期已过的 ACTIVE 职位标记为 EXPIRED
    pub async fn expire_overdue(&self) -> Result<u64, ApplicationError> {
        let expired = self
            .deps
            .job_repository
            .expire_overdue(self.deps.clock.now())
            .await?;
        info!(expired, "职位过期检查完成");
        Ok(expired)
    }

    async fn require_job(&self, id: JobId) -> Result<Job, ApplicationError> {
        self.deps
            .job_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("job", id))
    }

    async fn ensure_scope(&self, job: &Job, scope: Scope) -> Result<(), ApplicationError> {
        let Scope::Recruiter(user_id) = scope else {
            return Ok(());
        };
        let company_id = recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?;
        if job.company_id != Some(company_id) {
            return Err(ApplicationError::access_denied(
                "job does not belong to your company",
            ));
        }
        Ok(())
    }

    /// 技能 ID 必须全部存在
    async fn resolve_skills(&self, ids: &[SkillId]) -> Result<Vec<Skill>, ApplicationError> {
        let skills = self.deps.skill_repository.find_by_ids(ids).await?;
        if ids.iter().any(|id| !skills.iter().any(|s| s.id == *id)) {
            return Err(ApplicationError::business_rule(
                "one or more skills do not exist",
            ));
        }
        Ok(skills)
    }

    async fn to_dto(&self, job: &Job) -> Result<JobDto, ApplicationError> {
        let company = match job.company_id {
            Some(id) => self.deps.company_repository.find_by_id(id).await?,
            None => None,
        };
        Ok(JobDto::new(job, company.as_ref(), self.deps.clock.now()))
    }

    async fn to_page(&self, jobs: Page<Job>) -> Result<Page<JobDto>, ApplicationError> {
        let mut companies = HashMap::new();
        for id in jobs.content.iter().filter_map(|job| job.company_id) {
            if let Entry::Vacant(entry) = companies.entry(id) {
                entry.insert(self.deps.company_repository.find_by_id(id).await?);
            }
        }
        let now = self.deps.clock.now();
        Ok(jobs.map(|job| {
            let company = job
                .company_id
                .and_then(|id| companies.get(&id))
                .and_then(Option::as_ref);
            JobDto::new(&job, company, now)
        }))
    }
}
