use application::{UserFilter, UserRepository};
use async_trait::async_trait;
use chrono::NaiveDate;
use domain::{
    CompanyId, Email, Gender, Page, PageRequest, PasswordHash, RepositoryError, RoleId, Timestamp,
    User, UserId,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{invalid_data, like_pattern, map_sqlx_err, to_count};

const SELECT_USER: &str = "SELECT id, name, email, password_hash, dob, address, gender, logo_url, \
     company_id, role_id, created_at, updated_at FROM users";

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    dob: Option<NaiveDate>,
    address: Option<String>,
    gender: Option<Gender>,
    logo_url: Option<String>,
    company_id: Option<Uuid>,
    role_id: Option<Uuid>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let email = Email::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            name: value.name,
            email,
            password,
            dob: value.dob,
            address: value.address,
            gender: value.gender,
            logo_url: value.logo_url,
            company_id: value.company_id.map(CompanyId::from),
            role_id: value.role_id.map(RoleId::from),
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn into_users(records: Vec<UserRecord>) -> Result<Vec<User>, RepositoryError> {
    records.into_iter().map(User::try_from).collect()
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, name, email, password_hash, dob, address, gender, logo_url,
                               company_id, role_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, name, email, password_hash, dob, address, gender, logo_url,
                      company_id, role_id, created_at, updated_at
            "#,
        )
        .bind(user.id.0)
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.dob)
        .bind(&user.address)
        .bind(user.gender)
        .bind(&user.logo_url)
        .bind(user.company_id.map(|id| id.0))
        .bind(user.role_id.map(|id| id.0))
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, dob = $5, address = $6, gender = $7,
                logo_url = $8, company_id = $9, role_id = $10, updated_at = $11
            WHERE id = $1
            RETURNING id, name, email, password_hash, dob, address, gender, logo_url,
                      company_id, role_id, created_at, updated_at
            "#,
        )
        .bind(user.id.0)
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.dob)
        .bind(&user.address)
        .bind(user.gender)
        .bind(&user.logo_url)
        .bind(user.company_id.map(|id| id.0))
        .bind(user.role_id.map(|id| id.0))
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(record)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "{SELECT_USER} WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn list(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, RepositoryError> {
        let name = like_pattern(filter.name.as_deref());
        let email = like_pattern(filter.email.as_deref());
        let condition = "($1::text IS NULL OR name ILIKE $1) AND ($2::text IS NULL OR email ILIKE $2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {condition}"))
            .bind(&name)
            .bind(&email)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "{SELECT_USER} WHERE {condition} ORDER BY created_at, id LIMIT $3 OFFSET $4"
        ))
        .bind(&name)
        .bind(&email)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Page::new(into_users(records)?, page, to_count(total)))
    }

    async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "{SELECT_USER} WHERE company_id = $1 ORDER BY created_at, id"
        ))
        .bind(company_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_users(records)
    }

    async fn list_by_role_name(&self, role_name: &str) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.dob, u.address, u.gender, u.logo_url,
                   u.company_id, u.role_id, u.created_at, u.updated_at
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE UPPER(r.name) = UPPER($1)
            ORDER BY u.created_at, u.id
            "#,
        )
        .bind(role_name)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_users(records)
    }
}
