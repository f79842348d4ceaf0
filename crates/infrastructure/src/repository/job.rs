use application::{JobFilter, JobRepository};
use async_trait::async_trait;
use domain::{
    CompanyId, Job, JobId, JobLevel, JobStatus, Page, PageRequest, RepositoryError, SkillId,
    Timestamp,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::skill::{replace_skill_links, skills_by_owner};
use super::{like_pattern, map_sqlx_err, to_count};

const SELECT_JOB: &str = "SELECT id, name, location, salary, quantity, level, description, \
     start_date, end_date, status, company_id, created_at, updated_at FROM jobs";

const JOB_SKILLS: &str = r#"
    SELECT js.job_id AS owner_id, s.id, s.name, s.created_at, s.updated_at
    FROM job_skills js
    JOIN skills s ON s.id = js.skill_id
    WHERE js.job_id = ANY($1)
    ORDER BY s.name
"#;

const FILTER: &str = "($1::text IS NULL OR name ILIKE $1) \
     AND ($2::text IS NULL OR location ILIKE $2) \
     AND ($3::job_level IS NULL OR level = $3)";

#[derive(Debug, FromRow)]
struct JobRecord {
    id: Uuid,
    name: String,
    location: String,
    salary: f64,
    quantity: i32,
    level: JobLevel,
    description: String,
    start_date: Timestamp,
    end_date: Timestamp,
    status: JobStatus,
    company_id: Option<Uuid>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

#[derive(Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_skills(&self, records: Vec<JobRecord>) -> Result<Vec<Job>, RepositoryError> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut skills = skills_by_owner(&self.pool, JOB_SKILLS, &ids).await?;

        Ok(records
            .into_iter()
            .map(|record| Job {
                id: JobId::from(record.id),
                skills: skills.remove(&record.id).unwrap_or_default(),
                name: record.name,
                location: record.location,
                salary: record.salary,
                quantity: record.quantity,
                level: record.level,
                description: record.description,
                start_date: record.start_date,
                end_date: record.end_date,
                status: record.status,
                company_id: record.company_id.map(CompanyId::from),
                created_at: record.created_at,
                updated_at: record.updated_at,
            })
            .collect())
    }

    async fn reload(&self, id: JobId) -> Result<Job, RepositoryError> {
        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        sqlx::query(
            r#"
            INSERT INTO jobs (id, name, location, salary, quantity, level, description,
                              start_date, end_date, status, company_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(job.id.0)
        .bind(&job.name)
        .bind(&job.location)
        .bind(job.salary)
        .bind(job.quantity)
        .bind(job.level)
        .bind(&job.description)
        .bind(job.start_date)
        .bind(job.end_date)
        .bind(job.status)
        .bind(job.company_id.map(|id| id.0))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        replace_skill_links(&mut tx, "job_skills", "job_id", job.id.0, &job.skills).await?;
        tx.commit().await.map_err(map_sqlx_err)?;

        self.reload(job.id).await
    }

    async fn update(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET name = $2, location = $3, salary = $4, quantity = $5, level = $6,
                description = $7, start_date = $8, end_date = $9, status = $10,
                company_id = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(job.id.0)
        .bind(&job.name)
        .bind(&job.location)
        .bind(job.salary)
        .bind(job.quantity)
        .bind(job.level)
        .bind(&job.description)
        .bind(job.start_date)
        .bind(job.end_date)
        .bind(job.status)
        .bind(job.company_id.map(|id| id.0))
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        replace_skill_links(&mut tx, "job_skills", "job_id", job.id.0, &job.skills).await?;
        tx.commit().await.map_err(map_sqlx_err)?;

        self.reload(job.id).await
    }

    async fn delete(&self, id: JobId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let record = sqlx::query_as::<_, JobRecord>(&format!("{SELECT_JOB} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        match record {
            Some(record) => Ok(self.attach_skills(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<Job>, RepositoryError> {
        let name = like_pattern(filter.name.as_deref());
        let location = like_pattern(filter.location.as_deref());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM jobs WHERE {FILTER}"))
            .bind(&name)
            .bind(&location)
            .bind(filter.level)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, JobRecord>(&format!(
            "{SELECT_JOB} WHERE {FILTER} ORDER BY created_at DESC, id LIMIT $4 OFFSET $5"
        ))
        .bind(&name)
        .bind(&location)
        .bind(filter.level)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let jobs = self.attach_skills(records).await?;
        Ok(Page::new(jobs, page, to_count(total)))
    }

    async fn list_by_company(
        &self,
        company_id: CompanyId,
        page: PageRequest,
    ) -> Result<Page<Job>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE company_id = $1")
            .bind(company_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, JobRecord>(&format!(
            "{SELECT_JOB} WHERE company_id = $1 ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        ))
        .bind(company_id.0)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let jobs = self.attach_skills(records).await?;
        Ok(Page::new(jobs, page, to_count(total)))
    }

    async fn count_by_level(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<(JobLevel, u64)>, RepositoryError> {
        let rows: Vec<(JobLevel, i64)> = sqlx::query_as(
            r#"
            SELECT level, COUNT(*) FROM jobs
            WHERE ($1::uuid IS NULL OR company_id = $1)
            GROUP BY level
            "#,
        )
        .bind(company_id.map(|id| id.0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|(level, count)| (level, to_count(count)))
            .collect())
    }

    async fn expire_overdue(&self, now: Timestamp) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'EXPIRED', updated_at = $1
            WHERE status = 'ACTIVE' AND end_date < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn latest_by_skills(
        &self,
        skill_ids: &[SkillId],
        limit: i64,
    ) -> Result<Vec<Job>, RepositoryError> {
        let ids: Vec<Uuid> = skill_ids.iter().map(|id| id.0).collect();
        let records = sqlx::query_as::<_, JobRecord>(&format!(
            "{SELECT_JOB} j WHERE EXISTS ( \
                SELECT 1 FROM job_skills js WHERE js.job_id = j.id AND js.skill_id = ANY($1)) \
             ORDER BY j.created_at DESC, j.id LIMIT $2"
        ))
        .bind(&ids)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.attach_skills(records).await
    }
}
