use application::CompanyRepository;
use async_trait::async_trait;
use domain::{Company, CompanyId, Page, PageRequest, RepositoryError, Timestamp, UserId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{like_pattern, map_sqlx_err, to_count};

const SELECT_COMPANY: &str = "SELECT id, name, description, address, logo_url, owner_id, \
     created_at, updated_at FROM companies";

#[derive(Debug, FromRow)]
struct CompanyRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    address: Option<String>,
    logo_url: Option<String>,
    owner_id: Option<Uuid>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<CompanyRecord> for Company {
    fn from(value: CompanyRecord) -> Self {
        Company {
            id: CompanyId::from(value.id),
            name: value.name,
            description: value.description,
            address: value.address,
            logo_url: value.logo_url,
            owner_id: value.owner_id.map(UserId::from),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CompanyJobCountRow {
    #[sqlx(flatten)]
    company: CompanyRecord,
    job_count: i64,
}

#[derive(Clone)]
pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn create(&self, company: Company) -> Result<Company, RepositoryError> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            r#"
            INSERT INTO companies (id, name, description, address, logo_url, owner_id,
                                   created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, address, logo_url, owner_id, created_at, updated_at
            "#,
        )
        .bind(company.id.0)
        .bind(&company.name)
        .bind(&company.description)
        .bind(&company.address)
        .bind(&company.logo_url)
        .bind(company.owner_id.map(|id| id.0))
        .bind(company.created_at)
        .bind(company.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn update(&self, company: Company) -> Result<Company, RepositoryError> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            r#"
            UPDATE companies
            SET name = $2, description = $3, address = $4, logo_url = $5, owner_id = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING id, name, description, address, logo_url, owner_id, created_at, updated_at
            "#,
        )
        .bind(company.id.0)
        .bind(&company.name)
        .bind(&company.description)
        .bind(&company.address)
        .bind(&company.logo_url)
        .bind(company.owner_id.map(|id| id.0))
        .bind(company.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(record.into())
    }

    async fn delete(&self, id: CompanyId) -> Result<(), RepositoryError> {
        // 成员 company_id 置空，职位与投递级联删除
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        let record =
            sqlx::query_as::<_, CompanyRecord>(&format!("{SELECT_COMPANY} WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        Ok(record.map(Company::from))
    }

    async fn list(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Company>, RepositoryError> {
        let name = like_pattern(name);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM companies WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, CompanyRecord>(&format!(
            "{SELECT_COMPANY} WHERE ($1::text IS NULL OR name ILIKE $1) \
             ORDER BY created_at, id LIMIT $2 OFFSET $3"
        ))
        .bind(&name)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let content = records.into_iter().map(Company::from).collect();
        Ok(Page::new(content, page, to_count(total)))
    }

    async fn list_with_job_counts(&self) -> Result<Vec<(Company, u64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, CompanyJobCountRow>(
            r#"
            SELECT c.id, c.name, c.description, c.address, c.logo_url, c.owner_id,
                   c.created_at, c.updated_at, COUNT(j.id) AS job_count
            FROM companies c
            LEFT JOIN jobs j ON j.company_id = c.id
            GROUP BY c.id
            ORDER BY c.created_at, c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|row| (Company::from(row.company), to_count(row.job_count)))
            .collect())
    }
}
