use std::collections::HashMap;

use application::RoleRepository;
use async_trait::async_trait;
use domain::{Page, PageRequest, Permission, RepositoryError, Role, RoleId, Timestamp};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::permission::PermissionRecord;
use super::{map_sqlx_err, to_count};

const SELECT_ROLE: &str =
    "SELECT id, name, description, active, created_at, updated_at FROM roles";

#[derive(Debug, FromRow)]
struct RoleRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    active: bool,
    created_at: Timestamp,
    updated_at: Timestamp,
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: Uuid,
    #[sqlx(flatten)]
    permission: PermissionRecord,
}

#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 为一批角色补齐权限列表
    async fn attach_permissions(
        &self,
        records: Vec<RoleRecord>,
    ) -> Result<Vec<Role>, RepositoryError> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT rp.role_id, p.id, p.name, p.api_path, p.method, p.module,
                   p.created_at, p.updated_at
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ANY($1)
            ORDER BY p.module, p.api_path, p.method
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let mut grouped: HashMap<Uuid, Vec<Permission>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.role_id)
                .or_default()
                .push(row.permission.into());
        }

        Ok(records
            .into_iter()
            .map(|record| Role {
                id: RoleId::from(record.id),
                permissions: grouped.remove(&record.id).unwrap_or_default(),
                name: record.name,
                description: record.description,
                active: record.active,
                created_at: record.created_at,
                updated_at: record.updated_at,
            })
            .collect())
    }

    async fn reload(&self, id: RoleId) -> Result<Role, RepositoryError> {
        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }
}

async fn replace_permissions(
    conn: &mut PgConnection,
    role: &Role,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role.id.0)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_err)?;

    let permission_ids: Vec<Uuid> = role.permissions.iter().map(|p| p.id.0).collect();
    if permission_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(role.id.0)
    .bind(&permission_ids)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn create(&self, role: Role) -> Result<Role, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id.0)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.active)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        replace_permissions(&mut tx, &role).await?;
        tx.commit().await.map_err(map_sqlx_err)?;

        self.reload(role.id).await
    }

    async fn update(&self, role: Role) -> Result<Role, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let result = sqlx::query(
            r#"
            UPDATE roles SET name = $2, description = $3, active = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(role.id.0)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.active)
        .bind(role.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        replace_permissions(&mut tx, &role).await?;
        tx.commit().await.map_err(map_sqlx_err)?;

        self.reload(role.id).await
    }

    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        // users.role_id 由外键置空
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let record = sqlx::query_as::<_, RoleRecord>(&format!("{SELECT_ROLE} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        match record {
            Some(record) => Ok(self.attach_permissions(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        let record = sqlx::query_as::<_, RoleRecord>(&format!(
            "{SELECT_ROLE} WHERE UPPER(name) = UPPER($1)"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match record {
            Some(record) => Ok(self.attach_permissions(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Role>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, RoleRecord>(&format!(
            "{SELECT_ROLE} ORDER BY created_at, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let roles = self.attach_permissions(records).await?;
        Ok(Page::new(roles, page, to_count(total)))
    }
}
