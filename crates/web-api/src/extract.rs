//! 请求体提取工具：带校验的 JSON、分页参数、multipart 文件。

use std::collections::HashMap;

use axum::{
    extract::{FromRequest, Multipart, Request},
    Json,
};
use domain::PageRequest;
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

use crate::error::ApiError;

/// 反序列化后再执行 `validator` 校验的 JSON 请求体
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| ApiError::validation(errors.to_string()))?;
        Ok(Self(value))
    }
}

const DEFAULT_PAGE_SIZE: u32 = 10;

/// `?page=1&size=10`，页码从 1 开始
///
/// 带过滤条件的查询不能 `flatten` 本结构，urlencoded 下数字字段会解析失败。
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageQuery {
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self { page, size }
    }

    pub fn request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub bytes: Vec<u8>,
}

/// 读出全部 multipart 字段，按字段名索引
pub async fn read_multipart(
    mut multipart: Multipart,
) -> Result<HashMap<String, UploadedPart>, ApiError> {
    let mut parts = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::validation(err.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::validation(err.body_text()))?;
        parts.insert(
            name,
            UploadedPart {
                bytes: bytes.to_vec(),
            },
        );
    }
    Ok(parts)
}

pub fn take_part(
    parts: &mut HashMap<String, UploadedPart>,
    name: &str,
) -> Result<UploadedPart, ApiError> {
    parts
        .remove(name)
        .ok_or_else(|| ApiError::validation(format!("multipart field `{name}` is required")))
}
