//! bcrypt 密码哈希
//!
//! bcrypt 是 CPU 密集操作，放到阻塞线程池执行，避免卡住异步运行时。
//! 兼容 `$2a$` / `$2b$` / `$2y$` 前缀的历史哈希。

use application::{PasswordHasher, PasswordHasherError};
use async_trait::async_trait;
use bcrypt::DEFAULT_COST;
use domain::PasswordHash;

#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    /// `cost` 为空时使用 bcrypt 默认强度
    pub fn new(cost: Option<u32>) -> Self {
        Self {
            cost: cost.unwrap_or(DEFAULT_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(None)
    }
}

async fn run_blocking<T, F>(
    task: F,
    on_error: fn(String) -> PasswordHasherError,
) -> Result<T, PasswordHasherError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(on_error(err.to_string())),
        Err(join) => Err(on_error(join.to_string())),
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        let hashed = run_blocking(
            move || bcrypt::hash(plaintext, cost),
            PasswordHasherError::hash_error,
        )
        .await?;

        PasswordHash::new(hashed).map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let hashed = hashed.as_str().to_owned();
        run_blocking(
            move || bcrypt::verify(plaintext, &hashed),
            PasswordHasherError::verify_error,
        )
        .await
    }
}
