use application::SubscriberRepository;
use async_trait::async_trait;
use domain::{Email, RepositoryError, Subscriber, SubscriberId, Timestamp};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::skill::{replace_skill_links, skills_by_owner};
use super::{invalid_data, map_sqlx_err};

const SELECT_SUBSCRIBER: &str =
    "SELECT id, name, email, created_at, updated_at FROM subscribers";

const SUBSCRIBER_SKILLS: &str = r#"
    SELECT ss.subscriber_id AS owner_id, s.id, s.name, s.created_at, s.updated_at
    FROM subscriber_skills ss
    JOIN skills s ON s.id = ss.skill_id
    WHERE ss.subscriber_id = ANY($1)
    ORDER BY s.name
"#;

#[derive(Debug, FromRow)]
struct SubscriberRecord {
    id: Uuid,
    name: String,
    email: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

#[derive(Clone)]
pub struct PgSubscriberRepository {
    pool: PgPool,
}

impl PgSubscriberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_skills(
        &self,
        records: Vec<SubscriberRecord>,
    ) -> Result<Vec<Subscriber>, RepositoryError> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut skills = skills_by_owner(&self.pool, SUBSCRIBER_SKILLS, &ids).await?;

        records
            .into_iter()
            .map(|record| {
                let email =
                    Email::parse(record.email).map_err(|err| invalid_data(err.to_string()))?;
                Ok(Subscriber {
                    id: SubscriberId::from(record.id),
                    skills: skills.remove(&record.id).unwrap_or_default(),
                    name: record.name,
                    email,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                })
            })
            .collect()
    }

    async fn reload(&self, id: SubscriberId) -> Result<Subscriber, RepositoryError> {
        let record =
            sqlx::query_as::<_, SubscriberRecord>(&format!("{SELECT_SUBSCRIBER} WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?
                .ok_or(RepositoryError::NotFound)?;

        self.attach_skills(vec![record])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl SubscriberRepository for PgSubscriberRepository {
    async fn create(&self, subscriber: Subscriber) -> Result<Subscriber, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        sqlx::query(
            r#"
            INSERT INTO subscribers (id, name, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(subscriber.id.0)
        .bind(&subscriber.name)
        .bind(subscriber.email.as_str())
        .bind(subscriber.created_at)
        .bind(subscriber.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        replace_skill_links(
            &mut tx,
            "subscriber_skills",
            "subscriber_id",
            subscriber.id.0,
            &subscriber.skills,
        )
        .await?;
        tx.commit().await.map_err(map_sqlx_err)?;

        self.reload(subscriber.id).await
    }

    async fn update(&self, subscriber: Subscriber) -> Result<Subscriber, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let result = sqlx::query(
            "UPDATE subscribers SET name = $2, email = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(subscriber.id.0)
        .bind(&subscriber.name)
        .bind(subscriber.email.as_str())
        .bind(subscriber.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        replace_skill_links(
            &mut tx,
            "subscriber_skills",
            "subscriber_id",
            subscriber.id.0,
            &subscriber.skills,
        )
        .await?;
        tx.commit().await.map_err(map_sqlx_err)?;

        self.reload(subscriber.id).await
    }

    async fn delete(&self, id: SubscriberId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError> {
        let record = sqlx::query_as::<_, SubscriberRecord>(&format!(
            "{SELECT_SUBSCRIBER} WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match record {
            Some(record) => Ok(self.attach_skills(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let records = sqlx::query_as::<_, SubscriberRecord>(&format!(
            "{SELECT_SUBSCRIBER} ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.attach_skills(records).await
    }
}
