use application::PermissionRepository;
use async_trait::async_trait;
use domain::{Page, PageRequest, Permission, PermissionId, RepositoryError, Timestamp};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{map_sqlx_err, to_count};

const SELECT_PERMISSION: &str =
    "SELECT id, name, api_path, method, module, created_at, updated_at FROM permissions";

#[derive(Debug, FromRow)]
pub(super) struct PermissionRecord {
    id: Uuid,
    name: String,
    api_path: String,
    method: String,
    module: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<PermissionRecord> for Permission {
    fn from(value: PermissionRecord) -> Self {
        Permission {
            id: PermissionId::from(value.id),
            name: value.name,
            api_path: value.api_path,
            method: value.method,
            module: value.module,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn create(&self, permission: Permission) -> Result<Permission, RepositoryError> {
        let record = sqlx::query_as::<_, PermissionRecord>(
            r#"
            INSERT INTO permissions (id, name, api_path, method, module, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, api_path, method, module, created_at, updated_at
            "#,
        )
        .bind(permission.id.0)
        .bind(&permission.name)
        .bind(&permission.api_path)
        .bind(&permission.method)
        .bind(&permission.module)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn update(&self, permission: Permission) -> Result<Permission, RepositoryError> {
        let record = sqlx::query_as::<_, PermissionRecord>(
            r#"
            UPDATE permissions
            SET name = $2, api_path = $3, method = $4, module = $5, updated_at = $6
            WHERE id = $1
            RETURNING id, name, api_path, method, module, created_at, updated_at
            "#,
        )
        .bind(permission.id.0)
        .bind(&permission.name)
        .bind(&permission.api_path)
        .bind(&permission.method)
        .bind(&permission.module)
        .bind(permission.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(record.into())
    }

    async fn delete(&self, id: PermissionId) -> Result<(), RepositoryError> {
        // role_permissions 由外键级联清理
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: PermissionId) -> Result<Option<Permission>, RepositoryError> {
        let record =
            sqlx::query_as::<_, PermissionRecord>(&format!("{SELECT_PERMISSION} WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        Ok(record.map(Permission::from))
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> Result<Vec<Permission>, RepositoryError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        let records = sqlx::query_as::<_, PermissionRecord>(&format!(
            "{SELECT_PERMISSION} WHERE id = ANY($1) ORDER BY module, api_path, method"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Permission::from).collect())
    }

    async fn find_by_method_and_path(
        &self,
        method: &str,
        api_path: &str,
    ) -> Result<Option<Permission>, RepositoryError> {
        let record = sqlx::query_as::<_, PermissionRecord>(&format!(
            "{SELECT_PERMISSION} WHERE method = $1 AND api_path = $2"
        ))
        .bind(method)
        .bind(api_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Permission::from))
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Permission>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, PermissionRecord>(&format!(
            "{SELECT_PERMISSION} ORDER BY created_at, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let content = records.into_iter().map(Permission::from).collect();
        Ok(Page::new(content, page, to_count(total)))
    }

    async fn list_all(&self) -> Result<Vec<Permission>, RepositoryError> {
        let records = sqlx::query_as::<_, PermissionRecord>(&format!(
            "{SELECT_PERMISSION} ORDER BY module, api_path, method"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Permission::from).collect())
    }
}
