use std::collections::HashMap;

use application::SkillRepository;
use async_trait::async_trait;
use domain::{Page, PageRequest, RepositoryError, Skill, SkillId, Timestamp};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::{like_pattern, map_sqlx_err, to_count};

const SELECT_SKILL: &str = "SELECT id, name, created_at, updated_at FROM skills";

#[derive(Debug, FromRow)]
struct SkillRecord {
    id: Uuid,
    name: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<SkillRecord> for Skill {
    fn from(value: SkillRecord) -> Self {
        Skill {
            id: SkillId::from(value.id),
            name: value.name,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// 多对多关联表中的一行技能，`owner_id` 为职位或订阅者 ID
#[derive(Debug, FromRow)]
struct OwnedSkillRow {
    owner_id: Uuid,
    #[sqlx(flatten)]
    skill: SkillRecord,
}

#[derive(Clone)]
pub struct PgSkillRepository {
    pool: PgPool,
}

impl PgSkillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SkillRepository for PgSkillRepository {
    async fn create(&self, skill: Skill) -> Result<Skill, RepositoryError> {
        let record = sqlx::query_as::<_, SkillRecord>(
            r#"
            INSERT INTO skills (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(skill.id.0)
        .bind(&skill.name)
        .bind(skill.created_at)
        .bind(skill.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn update(&self, skill: Skill) -> Result<Skill, RepositoryError> {
        let record = sqlx::query_as::<_, SkillRecord>(
            r#"
            UPDATE skills SET name = $2, updated_at = $3 WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(skill.id.0)
        .bind(&skill.name)
        .bind(skill.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(record.into())
    }

    async fn delete(&self, id: SkillId) -> Result<(), RepositoryError> {
        // job_skills 与 subscriber_skills 级联清理
        let result = sqlx::query("DELETE FROM skills WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError> {
        let record = sqlx::query_as::<_, SkillRecord>(&format!("{SELECT_SKILL} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(record.map(Skill::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Skill>, RepositoryError> {
        let record = sqlx::query_as::<_, SkillRecord>(&format!(
            "{SELECT_SKILL} WHERE LOWER(name) = LOWER($1)"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Skill::from))
    }

    async fn find_by_ids(&self, ids: &[SkillId]) -> Result<Vec<Skill>, RepositoryError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        let records = sqlx::query_as::<_, SkillRecord>(&format!(
            "{SELECT_SKILL} WHERE id = ANY($1) ORDER BY name"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Skill::from).collect())
    }

    async fn list(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Skill>, RepositoryError> {
        let name = like_pattern(name);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM skills WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, SkillRecord>(&format!(
            "{SELECT_SKILL} WHERE ($1::text IS NULL OR name ILIKE $1) \
             ORDER BY created_at, id LIMIT $2 OFFSET $3"
        ))
        .bind(&name)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let content = records.into_iter().map(Skill::from).collect();
        Ok(Page::new(content, page, to_count(total)))
    }
}

/// 执行返回 `owner_id` + 技能列的关联查询，按所属者分组
pub(super) async fn skills_by_owner(
    pool: &PgPool,
    sql: &str,
    owner_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Skill>>, RepositoryError> {
    let rows = sqlx::query_as::<_, OwnedSkillRow>(sql)
        .bind(owner_ids)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_err)?;

    let mut grouped: HashMap<Uuid, Vec<Skill>> = HashMap::new();
    for row in rows {
        grouped.entry(row.owner_id).or_default().push(row.skill.into());
    }
    Ok(grouped)
}

/// 以 `skills` 覆盖某个所属者在关联表中的技能
pub(super) async fn replace_skill_links(
    conn: &mut PgConnection,
    table: &'static str,
    owner_column: &'static str,
    owner_id: Uuid,
    skills: &[Skill],
) -> Result<(), RepositoryError> {
    sqlx::query(&format!("DELETE FROM {table} WHERE {owner_column} = $1"))
        .bind(owner_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_err)?;

    let skill_ids: Vec<Uuid> = skills.iter().map(|s| s.id.0).collect();
    if skill_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(&format!(
        "INSERT INTO {table} ({owner_column}, skill_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING"
    ))
    .bind(owner_id)
    .bind(&skill_ids)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}
