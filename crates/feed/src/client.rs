use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use zeshi_core::market::error::MarketError;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// # Summary
/// 构建行情接口共用的 HTTP 客户端。
///
/// # Logic
/// 1. 若进程内尚未安装 rustls 加密后端，则安装 ring 实现。
/// 2. 设置伪装浏览器 Header (User-Agent) 以减少被拦截风险。
/// 3. 配置请求超时并构建客户端。
///
/// # Arguments
/// * `timeout`: 单次请求超时。
///
/// # Returns
/// 成功返回 `Client`，构建失败返回 `MarketError::Network`。
pub fn build_client(timeout: Duration) -> Result<Client, MarketError> {
    if rustls::crypto::CryptoProvider::get_default().is_none()
        && rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
    {
        // 并发安装时另一方已经成功
        debug!("rustls crypto provider already installed");
    }

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| MarketError::Network(e.to_string()))
}

/// # Summary
/// 将接口返回的数字或数字字符串统一解析为 f64。
///
/// # Logic
/// 停牌股票常以 `"-"` 或空串占位，此类值返回 None。
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// 成交量字段解析，兼容 "123.0" 形式
pub fn parse_volume(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if !v.is_finite() || v < 0.0 || v >= 1.8e19 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(v.round() as u64)
}
