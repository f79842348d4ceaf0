//! AI 求职助手对话
//!
//! 历史优先读 Redis 缓存，未命中时从数据库回填；每轮问答双写数据库与缓存。

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use domain::chat::{validate_question, validate_session_id};
use domain::{ChatMessage, MessageRole, UserId};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    chat_cache::ChatHistoryCache,
    clock::Clock,
    dto::{ChatAnswerDto, ChatMessageDto, ChatSessionDto, ChatSessionInfoDto},
    error::ApplicationError,
    llm::LlmClient,
    repository::{ChatMessageRepository, UserRepository},
};

use super::require_user;

/// 缓存未命中时从数据库加载的最大历史条数
pub const CHAT_HISTORY_DB_LIMIT: i64 = 50;
/// 会话列表中消息预览的最大字符数
pub const PREVIEW_MAX_CHARS: usize = 50;

const HISTORY_VIEW_LIMIT: i64 = 1_000;

pub struct ChatServiceDependencies {
    pub chat_repository: Arc<dyn ChatMessageRepository>,
    pub history_cache: Arc<dyn ChatHistoryCache>,
    pub llm: Arc<dyn LlmClient>,
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn send(
        &self,
        user_id: UserId,
        session_id: &str,
        question: &str,
    ) -> Result<ChatAnswerDto, ApplicationError> {
        validate_question(question)?;
        validate_session_id(session_id)?;
        require_user(self.deps.user_repository.as_ref(), user_id).await?;

        let history = self
            .load_history(user_id, session_id, CHAT_HISTORY_DB_LIMIT)
            .await?;

        let question_message = ChatMessage::new(
            user_id,
            session_id,
            MessageRole::User,
            question,
            self.deps.clock.now(),
        );
        self.record(question_message).await?;

        let prompt = build_prompt(&history, question);
        let answer = self.deps.llm.complete(&prompt).await.map_err(|err| {
            error!(error = %err, session_id, "调用大模型失败");
            ApplicationError::infrastructure(format!("Lỗi kết nối AI: {err}"))
        })?;

        let answer_message = ChatMessage::new(
            user_id,
            session_id,
            MessageRole::Assistant,
            answer.as_str(),
            self.deps.clock.now(),
        );
        self.record(answer_message).await?;
        info!(user_id = %user_id, session_id, "AI 已回复");

        Ok(ChatAnswerDto {
            session_id: session_id.to_owned(),
            answer,
        })
    }

    pub async fn history(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<Vec<ChatMessageDto>, ApplicationError> {
        let user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        let history = self
            .load_history(user_id, session_id, HISTORY_VIEW_LIMIT)
            .await?;
        Ok(history
            .into_iter()
            .map(|message| ChatMessageDto::new(message, user.email.as_str()))
            .collect())
    }

    pub async fn clear(&self, user_id: UserId, session_id: &str) -> Result<u64, ApplicationError> {
        let deleted = self
            .deps
            .chat_repository
            .delete_session(user_id, session_id)
            .await?;
        self.deps.history_cache.clear(user_id, session_id).await?;
        info!(user_id = %user_id, session_id, deleted, "清空对话历史");
        Ok(deleted)
    }

    /// 按最后一条消息时间倒序列出会话
    pub async fn sessions(&self, user_id: UserId) -> Result<Vec<ChatSessionDto>, ApplicationError> {
        let messages = self.deps.chat_repository.list_by_user(user_id).await?;

        let mut grouped: BTreeMap<String, Vec<ChatMessage>> = BTreeMap::new();
        for message in messages {
            grouped
                .entry(message.session_id.clone())
                .or_default()
                .push(message);
        }

        let mut sessions: Vec<ChatSessionDto> = grouped
            .into_iter()
            .filter_map(|(session_id, messages)| {
                let first = messages.first()?;
                let last = messages.last()?;
                let first_text = match first.role {
                    MessageRole::User => first.content.as_str(),
                    MessageRole::Assistant => "Chat session",
                };
                Some(ChatSessionDto {
                    session_id,
                    first_message: truncate(first_text, PREVIEW_MAX_CHARS),
                    last_message: truncate(&last.content, PREVIEW_MAX_CHARS),
                    message_count: messages.len() as u64,
                    created_at: first.created_at,
                    last_message_time: last.created_at,
                })
            })
            .collect();
        sessions.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
        Ok(sessions)
    }

    pub async fn session_info(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<ChatSessionInfoDto, ApplicationError> {
        let cached = self
            .deps
            .history_cache
            .load(user_id, session_id)
            .await?
            .is_some_and(|messages| !messages.is_empty());
        let message_count = self
            .deps
            .chat_repository
            .count_by_session(user_id, session_id)
            .await?;
        Ok(ChatSessionInfoDto {
            session_id: session_id.to_owned(),
            exists: cached || message_count > 0,
            message_count,
        })
    }

    pub async fn new_session(&self, user_id: UserId) -> Result<String, ApplicationError> {
        let user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        let session_id = Uuid::new_v4().to_string();
        info!(user_id = %user.id, session_id = %session_id, "创建对话会话");
        Ok(session_id)
    }

    /// 缓存为空视为未命中，从数据库加载后回填
    async fn load_history(
        &self,
        user_id: UserId,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, ApplicationError> {
        if let Some(cached) = self.deps.history_cache.load(user_id, session_id).await? {
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let history = self
            .deps
            .chat_repository
            .list_by_session(user_id, session_id, limit)
            .await?;
        if !history.is_empty() {
            self.deps
                .history_cache
                .store(user_id, session_id, &history)
                .await?;
        }
        Ok(history)
    }

    async fn record(&self, message: ChatMessage) -> Result<(), ApplicationError> {
        let message = self.deps.chat_repository.create(message).await?;
        self.deps
            .history_cache
            .append(message.user_id, &message.session_id, &message)
            .await
    }
}

fn build_prompt(history: &[ChatMessage], question: &str) -> String {
    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("=== Lịch sử cuộc hội thoại ===\n\n");
        for message in history {
            let speaker = match message.role {
                MessageRole::User => "👤 Người dùng",
                MessageRole::Assistant => "🤖 Trợ lý",
            };
            let _ = write!(prompt, "{speaker}: {}\n\n", message.content);
        }
        prompt.push_str("=== Hết lịch sử ===\n\n");
    }
    let _ = write!(prompt, "👤 Người dùng (câu hỏi hiện tại): {question}");
    prompt.push_str("\n\n🤖 Trợ lý: ");
    prompt
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}
