use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// 统一的时间戳类型。
pub type Timestamp = DateTime<Utc>;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

entity_id!(
    /// 用户唯一标识。
    UserId
);
entity_id!(
    /// 角色唯一标识。
    RoleId
);
entity_id!(PermissionId);
entity_id!(
    /// 公司唯一标识。
    CompanyId
);
entity_id!(SkillId);
entity_id!(
    /// 职位唯一标识。
    JobId
);
entity_id!(ResumeId);
entity_id!(NotificationId);
entity_id!(PaymentId);
entity_id!(ChatMessageId);
entity_id!(SubscriberId);

/// 经过验证的邮箱。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(DomainError::invalid_argument("email", "cannot be empty"));
        }
        if value.len() > 255 {
            return Err(DomainError::invalid_argument("email", "too long"));
        }
        match value.split_once('@') {
            Some((local, host)) if !local.is_empty() && !host.is_empty() => Ok(Self(value)),
            _ => Err(DomainError::invalid_argument(
                "email",
                "must look like name@host",
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 大小写不敏感比较，登录与令牌校验都按此规则。
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::parse(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// 经过外部服务生成的密码哈希。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let hash = value.into();
        if hash.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "password_hash",
                "cannot be empty",
            ));
        }
        Ok(Self(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 分页请求，页码从 1 开始。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const MAX_SIZE: u32 = 100;

    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// 分页结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size);
        let total_pages = total_elements.div_ceil(size) as u32;
        Self {
            content,
            page: request.page,
            page_size: request.size,
            total_elements,
            total_pages,
        }
    }

    /// 对内存中的完整列表切片分页。
    pub fn slice(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let content = items
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.size as usize)
            .collect();
        Self::new(content, request, total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_requires_local_part_and_host() {
        assert!(Email::parse("  a@b.vn ").is_ok());
        assert!(Email::parse("").is_err());
        assert!(Email::parse("@b.vn").is_err());
        assert!(Email::parse("plain").is_err());
    }

    #[test]
    fn email_match_ignores_case() {
        let email = Email::parse("Tran.An@Example.com").unwrap();
        assert!(email.matches("tran.an@example.com"));
    }

    #[test]
    fn page_counts_partial_last_page() {
        let page = Page::slice((0..23).collect::<Vec<_>>(), PageRequest::new(3, 10));
        assert_eq!(page.content, vec![20, 21, 22]);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_elements, 23);
    }

    #[test]
    fn page_request_clamps_inputs() {
        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page, 1);
        assert_eq!(request.size, PageRequest::MAX_SIZE);
        assert_eq!(request.offset(), 0);
    }
}
