//! 公司管理：管理员维护全部公司，招聘者维护自己所属的公司与成员。

use std::sync::Arc;

use domain::{Company, CompanyDetails, CompanyId, Email, Page, PageRequest, User, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::{CompanyMemberDto, CompanyWithJobsDto},
    error::ApplicationError,
    repository::{CompanyRepository, ResumeRepository, UserRepository},
    storage::{file_extension, FileStorage},
};

use super::{recruiter_company_id, require_company, require_user};

pub struct CompanyServiceDependencies {
    pub company_repository: Arc<dyn CompanyRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub resume_repository: Arc<dyn ResumeRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub clock: Arc<dyn Clock>,
}

pub struct CompanyService {
    deps: CompanyServiceDependencies,
}

impl CompanyService {
    pub fn new(deps: CompanyServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create(&self, details: CompanyDetails) -> Result<Company, ApplicationError> {
        let company = Company::new(CompanyId::generate(), details, None, self.deps.clock.now())?;
        let stored = self.deps.company_repository.create(company).await?;
        info!(company_id = %stored.id, "创建公司");
        Ok(stored)
    }

    pub async fn update(
        &self,
        id: CompanyId,
        details: CompanyDetails,
    ) -> Result<Company, ApplicationError> {
        let mut company = require_company(self.deps.company_repository.as_ref(), id).await?;
        company.update(details, self.deps.clock.now())?;
        Ok(self.deps.company_repository.update(company).await?)
    }

    pub async fn get(&self, id: CompanyId) -> Result<Company, ApplicationError> {
        require_company(self.deps.company_repository.as_ref(), id).await
    }

    pub async fn list(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Company>, ApplicationError> {
        Ok(self.deps.company_repository.list(name, page).await?)
    }

    pub async fn list_with_job_counts(&self) -> Result<Vec<CompanyWithJobsDto>, ApplicationError> {
        let rows = self.deps.company_repository.list_with_job_counts().await?;
        Ok(rows
            .into_iter()
            .map(|(company, jobs_count)| CompanyWithJobsDto {
                company,
                jobs_count,
            })
            .collect())
    }

    /// 成员解绑，职位与投递由仓储级联删除；简历文件在此清理。
    pub async fn delete(&self, id: CompanyId) -> Result<Company, ApplicationError> {
        let company = require_company(self.deps.company_repository.as_ref(), id).await?;
        let resumes = self.deps.resume_repository.list_all_by_company(id).await?;

        self.deps.company_repository.delete(id).await?;
        for resume in resumes {
            if let Err(err) = self.deps.file_storage.delete(&resume.file_key).await {
                warn!(error = %err, key = %resume.file_key, "删除简历文件失败");
            }
        }
        info!(company_id = %id, "删除公司");
        Ok(company)
    }

    pub async fn upload_logo(
        &self,
        id: CompanyId,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<Company, ApplicationError> {
        let company = require_company(self.deps.company_repository.as_ref(), id).await?;
        self.store_logo(company, bytes, filename).await
    }

    /// 招聘者创建公司并成为其拥有者；已绑定公司时拒绝。
    pub async fn create_self(
        &self,
        user_id: UserId,
        details: CompanyDetails,
    ) -> Result<Company, ApplicationError> {
        let mut user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        if user.company_id.is_some() {
            return Err(ApplicationError::business_rule(
                "user already belongs to a company",
            ));
        }

        let now = self.deps.clock.now();
        let company = Company::new(CompanyId::generate(), details, Some(user_id), now)?;
        let stored = self.deps.company_repository.create(company).await?;

        user.assign_company(Some(stored.id), now);
        self.deps.user_repository.update(user).await?;
        info!(company_id = %stored.id, user_id = %user_id, "招聘者创建公司");
        Ok(stored)
    }

    pub async fn get_self(&self, user_id: UserId) -> Result<Company, ApplicationError> {
        let company_id = recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?;
        require_company(self.deps.company_repository.as_ref(), company_id).await
    }

    pub async fn update_self(
        &self,
        user_id: UserId,
        details: CompanyDetails,
    ) -> Result<Company, ApplicationError> {
        let company_id = recruiter_company_id(self.deps.user_repository.as_ref(), user_id).await?;
        self.update(company_id, details).await
    }

    pub async fn upload_self_logo(
        &self,
        user_id: UserId,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<Company, ApplicationError> {
        let company = self.get_self(user_id).await?;
        self.store_logo(company, bytes, filename).await
    }

    pub async fn list_members(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CompanyMemberDto>, ApplicationError> {
        let company = self.get_self(user_id).await?;
        let mut members = self
            .deps
            .user_repository
            .list_by_company(company.id)
            .await?;
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(members
            .iter()
            .map(|member| member_dto(member, &company))
            .collect())
    }

    /// 按邮箱把尚未绑定公司的用户加入招聘者的公司
    pub async fn add_member(
        &self,
        user_id: UserId,
        email: &str,
    ) -> Result<CompanyMemberDto, ApplicationError> {
        let company = self.get_self(user_id).await?;
        let mut member = self.find_by_email(email).await?;
        if member.company_id.is_some() {
            return Err(ApplicationError::business_rule(
                "user already belongs to a company",
            ));
        }

        member.assign_company(Some(company.id), self.deps.clock.now());
        let member = self.deps.user_repository.update(member).await?;
        info!(company_id = %company.id, member_id = %member.id, "添加公司成员");
        Ok(member_dto(&member, &company))
    }

    pub async fn remove_member(
        &self,
        user_id: UserId,
        email: &str,
    ) -> Result<CompanyMemberDto, ApplicationError> {
        let company = self.get_self(user_id).await?;
        let mut member = self.find_by_email(email).await?;
        if member.company_id != Some(company.id) {
            return Err(ApplicationError::access_denied(
                "user does not belong to your company",
            ));
        }
        if company.is_owned_by(member.id) {
            return Err(ApplicationError::business_rule(
                "the company owner cannot be removed",
            ));
        }

        member.assign_company(None, self.deps.clock.now());
        let member = self.deps.user_repository.update(member).await?;
        info!(company_id = %company.id, member_id = %member.id, "移除公司成员");
        Ok(member_dto(&member, &company))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, ApplicationError> {
        let email = Email::parse(email)?;
        self.deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApplicationError::not_found("user", email.as_str()))
    }

    /// 徽标保存为 `company-logos/{companyId}-{uuid}.{ext}`
    async fn store_logo(
        &self,
        mut company: Company,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<Company, ApplicationError> {
        if bytes.is_empty() {
            return Err(ApplicationError::invalid_argument("logo", "file is empty"));
        }
        let key = format!(
            "company-logos/{}-{}.{}",
            company.id,
            Uuid::new_v4(),
            file_extension(filename)
        );
        self.deps.file_storage.put(&key, bytes).await?;
        company.set_logo(self.deps.file_storage.public_url(&key), self.deps.clock.now());
        Ok(self.deps.company_repository.update(company).await?)
    }
}

fn member_dto(user: &User, company: &Company) -> CompanyMemberDto {
    CompanyMemberDto {
        id: user.id,
        name: user.name.clone(),
        email: user.email.as_str().to_owned(),
        owner: company.is_owned_by(user.id),
    }
}
