use application::ResumeRepository;
use async_trait::async_trait;
use domain::{
    CompanyId, Email, JobId, Page, PageRequest, RepositoryError, Resume, ResumeId, ResumeStatus,
    Timestamp, UserId,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{invalid_data, map_sqlx_err, to_count};

const SELECT_RESUME: &str = "SELECT r.id, r.email, r.file_key, r.status, r.user_id, r.job_id, \
     r.version, r.created_at, r.updated_at FROM resumes r";

const NEWEST_FIRST: &str = "ORDER BY r.created_at DESC, r.id";

#[derive(Debug, FromRow)]
struct ResumeRecord {
    id: Uuid,
    email: String,
    file_key: String,
    status: ResumeStatus,
    user_id: Uuid,
    job_id: Uuid,
    version: i64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<ResumeRecord> for Resume {
    type Error = RepositoryError;

    fn try_from(value: ResumeRecord) -> Result<Self, Self::Error> {
        let email = Email::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Resume {
            id: ResumeId::from(value.id),
            email,
            file_key: value.file_key,
            status: value.status,
            user_id: UserId::from(value.user_id),
            job_id: JobId::from(value.job_id),
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn into_resumes(records: Vec<ResumeRecord>) -> Result<Vec<Resume>, RepositoryError> {
    records.into_iter().map(Resume::try_from).collect()
}

#[derive(Clone)]
pub struct PgResumeRepository {
    pool: PgPool,
}

impl PgResumeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(
        &self,
        condition: &str,
        owner: Uuid,
    ) -> Result<Vec<Resume>, RepositoryError> {
        let records = sqlx::query_as::<_, ResumeRecord>(&format!(
            "{SELECT_RESUME} {condition} {NEWEST_FIRST}"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_resumes(records)
    }

    async fn fetch_page(
        &self,
        condition: &str,
        owner: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Resume>, RepositoryError> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM resumes r {condition}"))
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, ResumeRecord>(&format!(
            "{SELECT_RESUME} {condition} {NEWEST_FIRST} LIMIT $2 OFFSET $3"
        ))
        .bind(owner)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Page::new(into_resumes(records)?, page, to_count(total)))
    }
}

const BY_COMPANY: &str = "JOIN jobs j ON j.id = r.job_id WHERE j.company_id = $1";

#[async_trait]
impl ResumeRepository for PgResumeRepository {
    async fn create(&self, resume: Resume) -> Result<Resume, RepositoryError> {
        let record = sqlx::query_as::<_, ResumeRecord>(
            r#"
            INSERT INTO resumes (id, email, file_key, status, user_id, job_id, version,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, email, file_key, status, user_id, job_id, version, created_at, updated_at
            "#,
        )
        .bind(resume.id.0)
        .bind(resume.email.as_str())
        .bind(&resume.file_key)
        .bind(resume.status)
        .bind(resume.user_id.0)
        .bind(resume.job_id.0)
        .bind(resume.version)
        .bind(resume.created_at)
        .bind(resume.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Resume::try_from(record)
    }

    async fn update(&self, resume: Resume) -> Result<Resume, RepositoryError> {
        let record = sqlx::query_as::<_, ResumeRecord>(
            r#"
            UPDATE resumes
            SET email = $2, file_key = $3, status = $4, version = $5, updated_at = $6
            WHERE id = $1
            RETURNING id, email, file_key, status, user_id, job_id, version, created_at, updated_at
            "#,
        )
        .bind(resume.id.0)
        .bind(resume.email.as_str())
        .bind(&resume.file_key)
        .bind(resume.status)
        .bind(resume.version)
        .bind(resume.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Resume::try_from(record)
    }

    async fn delete(&self, id: ResumeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: ResumeId) -> Result<Option<Resume>, RepositoryError> {
        let record = sqlx::query_as::<_, ResumeRecord>(&format!("{SELECT_RESUME} WHERE r.id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(Resume::try_from).transpose()
    }

    async fn find_by_user_and_job(
        &self,
        user_id: UserId,
        job_id: JobId,
    ) -> Result<Option<Resume>, RepositoryError> {
        let record = sqlx::query_as::<_, ResumeRecord>(&format!(
            "{SELECT_RESUME} WHERE r.user_id = $1 AND r.job_id = $2"
        ))
        .bind(user_id.0)
        .bind(job_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Resume::try_from).transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Resume>, RepositoryError> {
        self.fetch_page("WHERE $1::uuid IS NULL", None, page).await
    }

    async fn list_by_company(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<Page<Resume>, RepositoryError> {
        self.fetch_page(BY_COMPANY, Some(company_id.0), page).await
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Resume>, RepositoryError> {
        self.fetch_page("WHERE r.user_id = $1", Some(user_id.0), page)
            .await
    }

    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<Resume>, RepositoryError> {
        self.fetch_all("WHERE r.job_id = $1", job_id.0).await
    }

    async fn list_all_by_user(&self, user_id: UserId) -> Result<Vec<Resume>, RepositoryError> {
        self.fetch_all("WHERE r.user_id = $1", user_id.0).await
    }

    async fn list_all_by_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<Resume>, RepositoryError> {
        self.fetch_all(BY_COMPANY, company_id.0).await
    }

    async fn count_by_job(&self, job_id: JobId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes WHERE job_id = $1")
            .bind(job_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(to_count(count))
    }

    async fn count_by_status(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<(ResumeStatus, u64)>, RepositoryError> {
        let rows: Vec<(ResumeStatus, i64)> = sqlx::query_as(
            r#"
            SELECT r.status, COUNT(*)
            FROM resumes r
            JOIN jobs j ON j.id = r.job_id
            WHERE ($1::uuid IS NULL OR j.company_id = $1)
            GROUP BY r.status
            "#,
        )
        .bind(company_id.map(|id| id.0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| (status, to_count(count)))
            .collect())
    }
}
