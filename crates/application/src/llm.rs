use async_trait::async_trait;

use crate::error::ApplicationError;

/// 大模型对话端口。系统提示词由实现方从配置中注入。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ApplicationError>;
}
