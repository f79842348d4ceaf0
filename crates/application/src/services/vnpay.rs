//! VNPay 支付链接签名与回调校验
//!
//! 参数按键名排序、跳过空值；签名串为 `key=urlencode(value)` 以 `&` 连接，
//! 签名为 HMAC-SHA512 的小写十六进制。

use std::collections::BTreeMap;

use chrono::{Duration, FixedOffset};
use config::VnPayConfig;
use domain::Timestamp;
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::ApplicationError;

type HmacSha512 = Hmac<Sha512>;

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
/// 支付成功的响应码
pub const RESPONSE_OK: &str = "00";

const VERSION: &str = "2.1.0";
const ORDER_TYPE: &str = "other";
const LOCALE: &str = "vn";
const CLIENT_IP: &str = "127.0.0.1";
const EXPIRE_AFTER_MINUTES: i64 = 15;
const DATE_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone)]
pub struct VnPaySigner {
    tmn_code: String,
    hash_secret: String,
    pay_url: String,
    return_url: String,
}

impl VnPaySigner {
    pub fn new(config: &VnPayConfig) -> Self {
        Self {
            tmn_code: config.tmn_code.clone(),
            hash_secret: config.hash_secret.clone(),
            pay_url: config.pay_url.clone(),
            return_url: config.return_url.clone(),
        }
    }

    /// 生成带签名的支付跳转地址，`amount` 单位为 VND。
    pub fn payment_url(
        &self,
        txn_ref: &str,
        order_info: &str,
        amount: i64,
        now: Timestamp,
    ) -> Result<String, ApplicationError> {
        let vietnam = FixedOffset::east_opt(7 * 3600)
            .ok_or_else(|| ApplicationError::infrastructure("invalid GMT+7 offset"))?;
        let created = now.with_timezone(&vietnam);
        let expires = created + Duration::minutes(EXPIRE_AFTER_MINUTES);

        let mut params = BTreeMap::new();
        params.insert("vnp_Version", VERSION.to_string());
        params.insert("vnp_Command", "pay".to_string());
        params.insert("vnp_TmnCode", self.tmn_code.clone());
        params.insert("vnp_Amount", (amount * 100).to_string());
        params.insert("vnp_CurrCode", "VND".to_string());
        params.insert("vnp_TxnRef", txn_ref.to_string());
        params.insert("vnp_OrderInfo", order_info.to_string());
        params.insert("vnp_OrderType", ORDER_TYPE.to_string());
        params.insert("vnp_Locale", LOCALE.to_string());
        params.insert("vnp_ReturnUrl", self.return_url.clone());
        params.insert("vnp_IpAddr", CLIENT_IP.to_string());
        params.insert("vnp_CreateDate", created.format(DATE_FORMAT).to_string());
        params.insert("vnp_ExpireDate", expires.format(DATE_FORMAT).to_string());

        let hash_data = hash_data(params.iter().map(|(k, v)| (*k, v.as_str())));
        let query = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.sign(&hash_data)?;

        Ok(format!(
            "{}?{}&{}={}",
            self.pay_url, query, SECURE_HASH, signature
        ))
    }

    /// 校验回调参数中的签名，比较时忽略大小写。
    pub fn verify(&self, params: &BTreeMap<String, String>) -> bool {
        let Some(received) = params.get(SECURE_HASH) else {
            return false;
        };
        let data = hash_data(
            params
                .iter()
                .filter(|(k, _)| k.as_str() != SECURE_HASH && k.as_str() != SECURE_HASH_TYPE)
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        self.sign(&data)
            .map(|expected| expected.eq_ignore_ascii_case(received))
            .unwrap_or(false)
    }

    pub fn sign(&self, data: &str) -> Result<String, ApplicationError> {
        let mut mac = HmacSha512::new_from_slice(self.hash_secret.as_bytes())
            .map_err(|err| ApplicationError::infrastructure(err.to_string()))?;
        mac.update(data.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// 调用方需保证按键名有序
fn hash_data<'a>(params: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    params
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, form_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `application/x-www-form-urlencoded`：空格编码为 `+`，`*` 保留，`~` 编码
fn form_encode(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%20", "+")
        .replace("%2A", "*")
        .replace('~', "%7E")
}
