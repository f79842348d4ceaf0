use std::sync::Arc;

use config::AppConfig;
use thiserror::Error;
use tracing::info;

use crate::{
    llm::OpenAiClient,
    mailer::{MailerError, SmtpMailer},
    migrations::MIGRATOR,
    password::BcryptPasswordHasher,
    redis::{self as redis_store, RedisChatHistoryCache, RedisError, RedisOtpStore, RedisRefreshTokenStore},
    repository::{create_pg_pool, PgStorage},
    storage::LocalFileStorage,
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("mailer error: {0}")]
    Mailer(#[from] MailerError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// 全部外部适配器，由 main 注入到各个应用服务中。
#[derive(Clone)]
pub struct Infrastructure {
    pub storage: Arc<PgStorage>,
    pub password_hasher: Arc<BcryptPasswordHasher>,
    pub refresh_tokens: Arc<RedisRefreshTokenStore>,
    pub otp_store: Arc<RedisOtpStore>,
    pub chat_cache: Arc<RedisChatHistoryCache>,
    pub mailer: Arc<SmtpMailer>,
    pub llm: Arc<OpenAiClient>,
    pub files: Arc<LocalFileStorage>,
}

impl Infrastructure {
    /// 连接数据库并执行迁移，连接 Redis，构建其余适配器
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        let pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;
        MIGRATOR.run(&pool).await?;
        info!("数据库迁移完成");

        let redis = redis_store::connect(&config.redis.url).await?;
        info!("Redis 已连接");

        Ok(Self {
            storage: Arc::new(PgStorage::new(pool)),
            password_hasher: Arc::new(BcryptPasswordHasher::new(config.server.bcrypt_cost)),
            refresh_tokens: Arc::new(RedisRefreshTokenStore::new(redis.clone())),
            otp_store: Arc::new(RedisOtpStore::new(redis.clone())),
            chat_cache: Arc::new(RedisChatHistoryCache::new(redis)),
            mailer: Arc::new(SmtpMailer::new(&config.mail, &config.server.frontend_url)?),
            llm: Arc::new(OpenAiClient::new(&config.llm)?),
            files: Arc::new(LocalFileStorage::new(&config.storage)),
        })
    }
}
