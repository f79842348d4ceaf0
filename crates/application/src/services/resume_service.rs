//! 简历投递：提交、替换 PDF、状态流转与统计。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{
    Company, Job, JobId, Page, PageRequest, Resume, ResumeId, ResumeStatus, UserId,
};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    dto::{ResumeCompanyDto, ResumeDto, ResumeJobDto, ResumeUserDto, StatusCountDto},
    error::ApplicationError,
    mailer::{Mailer, ResumeStatusMail},
    repository::{CompanyRepository, JobRepository, ResumeRepository, UserRepository},
    storage::{looks_like_pdf, FileStorage},
};

use super::{recruiter_company_id, require_user, NotificationService, Scope};

#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub email: String,
    pub job_id: JobId,
    pub pdf: Vec<u8>,
}

pub struct ResumeServiceDependencies {
    pub resume_repository: Arc<dyn ResumeRepository>,
    pub job_repository: Arc<dyn JobRepository>,
    pub company_repository: Arc<dyn CompanyRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub notifications: Arc<NotificationService>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

pub struct ResumeService {
    deps: ResumeServiceDependencies,
}

impl ResumeService {
    pub fn new(deps: ResumeServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn apply(
        &self,
        user_id: UserId,
        request: ApplyRequest,
    ) -> Result<ResumeDto, ApplicationError> {
        let user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        if !user.email.matches(&request.email) {
            return Err(ApplicationError::access_denied(
                "resume email must match the signed-in user",
            ));
        }

        let job = self.require_job(request.job_id).await?;
        let now = self.deps.clock.now();
        job.accepts_applications(now)?;

        if self
            .deps
            .resume_repository
            .find_by_user_and_job(user_id, job.id)
            .await?
            .is_some()
        {
            return Err(ApplicationError::already_exists(
                "resume",
                format!("{}:{}", user_id, job.id),
            ));
        }
        ensure_pdf(&request.pdf)?;

        let resume = Resume::submit(ResumeId::generate(), user.email.clone(), user_id, job.id, now);
        let resume = self.deps.resume_repository.create(resume).await?;
        // 文件写入失败时撤回记录
        if let Err(err) = self
            .deps
            .file_storage
            .put(&resume.file_key, request.pdf)
            .await
        {
            if let Err(cleanup) = self.deps.resume_repository.delete(resume.id).await {
                warn!(error = %cleanup, resume_id = %resume.id, "撤回简历记录失败");
            }
            return Err(err);
        }
        info!(resume_id = %resume.id, job_id = %job.id, user_id = %user_id, "提交简历");

        if let Err(err) = self
            .deps
            .notifications
            .notify_new_resume(&resume, &job, &user)
            .await
        {
            warn!(error = %err, resume_id = %resume.id, "发送新简历通知失败");
        }
        self.to_dto(resume).await
    }

    pub async fn list_all(&self, page: PageRequest) -> Result<Page<ResumeDto>, ApplicationError> {
        let resumes = self.deps.resume_repository.list(page).await?;
        self.to_page(resumes).await
    }

    pub async fn list_for_company(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<ResumeDto>, ApplicationError> {
        let company_id = recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?;
        let resumes = self
            .deps
            .resume_repository
            .list_by_company(company_id, page)
            .await?;
        self.to_page(resumes).await
    }

    pub async fn list_self(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<ResumeDto>, ApplicationError> {
        let resumes = self.deps.resume_repository.list_by_user(user_id, page).await?;
        self.to_page(resumes).await
    }

    /// 撤回对某职位的投递并删除文件
    pub async fn remove_self_by_job(
        &self,
        user_id: UserId,
        job_id: JobId,
    ) -> Result<(), ApplicationError> {
        let resume = self
            .deps
            .resume_repository
            .find_by_user_and_job(user_id, job_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("resume", job_id))?;

        self.deps.resume_repository.delete(resume.id).await?;
        if let Err(err) = self.deps.file_storage.delete(&resume.file_key).await {
            warn!(error = %err, key = %resume.file_key, "删除简历文件失败");
        }
        info!(resume_id = %resume.id, user_id = %user_id, "撤回简历");
        Ok(())
    }

    /// 替换 PDF：版本号加一，写入新键后删除旧文件
    pub async fn replace_self_file(
        &self,
        user_id: UserId,
        id: ResumeId,
        pdf: Vec<u8>,
    ) -> Result<ResumeDto, ApplicationError> {
        let mut resume = self.require_resume(id).await?;
        if resume.user_id != user_id {
            return Err(ApplicationError::access_denied("resume belongs to another user"));
        }
        ensure_pdf(&pdf)?;

        let old_key = resume.file_key.clone();
        let new_key = resume.bump_version(self.deps.clock.now()).to_owned();
        self.deps.file_storage.put(&new_key, pdf).await?;
        let resume = self.deps.resume_repository.update(resume).await?;

        if let Err(err) = self.deps.file_storage.delete(&old_key).await {
            warn!(error = %err, key = %old_key, "删除旧简历文件失败");
        }
        info!(resume_id = %id, version = resume.version, "替换简历文件");
        self.to_dto(resume).await
    }

    /// 仅投递人、管理员或职位所属公司的成员可获取文件地址
    pub async fn file_url(
        &self,
        viewer: UserId,
        is_admin: bool,
        id: ResumeId,
    ) -> Result<String, ApplicationError> {
        let resume = self.require_resume(id).await?;
        if resume.user_id != viewer && !is_admin {
            let viewer = require_user(self.deps.user_repository.as_ref(), viewer).await?;
            let job_company = self
                .deps
                .job_repository
                .find_by_id(resume.job_id)
                .await?
                .and_then(|job| job.company_id);
            if viewer.company_id.is_none() || viewer.company_id != job_company {
                return Err(ApplicationError::access_denied(
                    "not allowed to view this resume",
                ));
            }
        }
        Ok(self.deps.file_storage.public_url(&resume.file_key))
    }

    /// 更新状态、通知投递人并发送邮件；通知与邮件失败只记录日志
    pub async fn update_status(
        &self,
        actor: UserId,
        id: ResumeId,
        status: ResumeStatus,
        scope: Scope,
    ) -> Result<ResumeDto, ApplicationError> {
        let mut resume = self.require_resume(id).await?;
        let job = self.require_job(resume.job_id).await?;
        if let Scope::Recruiter(user_id) = scope {
            let company_id =
                recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?;
            if job.company_id != Some(company_id) {
                return Err(ApplicationError::access_denied(
                    "resume does not belong to your company",
                ));
            }
        }

        resume.set_status(status, self.deps.clock.now());
        let resume = self.deps.resume_repository.update(resume).await?;
        info!(resume_id = %id, status = status.as_str(), "更新简历状态");

        let company = self.company_of(&job).await?;
        if let Err(err) = self
            .deps
            .notifications
            .notify_resume_status_updated(&resume, &job, company.as_ref(), Some(actor))
            .await
        {
            warn!(error = %err, resume_id = %id, "发送状态更新通知失败");
        }

        let applicant_name = self
            .deps
            .user_repository
            .find_by_id(resume.user_id)
            .await?
            .map(|user| user.name)
            .unwrap_or_else(|| resume.email.as_str().to_owned());
        let mail = ResumeStatusMail {
            to: resume.email.clone(),
            applicant_name,
            job_name: job.name.clone(),
            company_name: company.as_ref().map(|c| c.name.clone()),
            status,
        };
        if let Err(err) = self.deps.mailer.send_resume_status(&mail).await {
            warn!(error = %err, resume_id = %id, "发送状态更新邮件失败");
        }

        self.to_dto(resume).await
    }

    /// 各状态投递数量，没有记录的状态计 0
    pub async fn count_by_status(
        &self,
        scope: Scope,
    ) -> Result<Vec<StatusCountDto>, ApplicationError> {
        let company_id = match scope {
            Scope::Admin => None,
            Scope::Recruiter(user_id) => {
                Some(recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?)
            }
        };
        let counts: HashMap<ResumeStatus, u64> = self
            .deps
            .resume_repository
            .count_by_status(company_id)
            .await?
            .into_iter()
            .collect();
        Ok(ResumeStatus::ALL
            .iter()
            .map(|status| StatusCountDto {
                status: *status,
                count: counts.get(status).copied().unwrap_or(0),
            })
            .collect())
    }

    pub async fn has_applied(&self, user_id: UserId, job_id: JobId) -> Result<bool, ApplicationError> {
        Ok(self
            .deps
            .resume_repository
            .find_by_user_and_job(user_id, job_id)
            .await?
            .is_some())
    }

    async fn require_resume(&self, id: ResumeId) -> Result<Resume, ApplicationError> {
        self.deps
            .resume_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("resume", id))
    }

    async fn require_job(&self, id: JobId) -> Result<Job, ApplicationError> {
        self.deps
            .job_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("job", id))
    }

    async fn company_of(&self, job: &Job) -> Result<Option<Company>, ApplicationError> {
        match job.company_id {
            Some(id) => Ok(self.deps.company_repository.find_by_id(id).await?),
            None => Ok(None),
        }
    }

    async fn to_dto(&self, resume: Resume) -> Result<ResumeDto, ApplicationError> {
        let job = self.deps.job_repository.find_by_id(resume.job_id).await?;
        let company = match &job {
            Some(job) => self.company_of(job).await?,
            None => None,
        };
        Ok(self.build_dto(resume, job.as_ref(), company.as_ref()))
    }

    async fn to_page(&self, resumes: Page<Resume>) -> Result<Page<ResumeDto>, ApplicationError> {
        let mut jobs: HashMap<JobId, Option<Job>> = HashMap::new();
        let mut companies = HashMap::new();
        for resume in &resumes.content {
            if jobs.contains_key(&resume.job_id) {
                continue;
            }
            let job = self.deps.job_repository.find_by_id(resume.job_id).await?;
            if let Some(company_id) = job.as_ref().and_then(|j| j.company_id) {
                if !companies.contains_key(&company_id) {
                    let company = self.deps.company_repository.find_by_id(company_id).await?;
                    companies.insert(company_id, company);
                }
            }
            jobs.insert(resume.job_id, job);
        }

        Ok(resumes.map(|resume| {
            let job = jobs.get(&resume.job_id).and_then(Option::as_ref);
            let company = job
                .and_then(|j| j.company_id)
                .and_then(|id| companies.get(&id))
                .and_then(Option::as_ref);
            self.build_dto(resume, job, company)
        }))
    }

    fn build_dto(&self, resume: Resume, job: Option<&Job>, company: Option<&Company>) -> ResumeDto {
        ResumeDto {
            id: resume.id,
            status: resume.status,
            pdf_url: self.deps.file_storage.public_url(&resume.file_key),
            version: resume.version,
            user: ResumeUserDto {
                id: resume.user_id,
                email: resume.email.as_str().to_owned(),
            },
            job: job.map(|job| ResumeJobDto {
                id: job.id,
                name: job.name.clone(),
                location: job.location.clone(),
                skills: job.skills.iter().map(|s| s.name.clone()).collect(),
                level: job.level,
                description: job.description.clone(),
            }),
            company: company.map(|c| ResumeCompanyDto {
                id: c.id,
                name: c.name.clone(),
                logo_url: c.logo_url.clone(),
            }),
            created_at: resume.created_at,
            updated_at: resume.updated_at,
        }
    }
}

fn ensure_pdf(bytes: &[u8]) -> Result<(), ApplicationError> {
    if bytes.is_empty() {
        return Err(ApplicationError::invalid_argument("pdfFile", "file is empty"));
    }
    if !looks_like_pdf(bytes) {
        return Err(ApplicationError::invalid_argument(
            "pdfFile",
            "only PDF files are accepted",
        ));
    }
    Ok(())
}
