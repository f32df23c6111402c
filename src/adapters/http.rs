use crate::utils::error::{FareWatchError, Result};
use reqwest::{Client, Response};
use std::time::Duration;

const USER_AGENT: &str = concat!("fare-watch/", env!("CARGO_PKG_VERSION"));
const BODY_EXCERPT_LIMIT: usize = 300;

/// 建立整個執行共用的 HTTP client；每個請求都有逾時上限
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FareWatchError::ConfigError {
            message: format!("failed to build HTTP client: {}", e),
        })
}

/// 讀取非 2xx 回應的內容摘要，供錯誤訊息使用
pub async fn error_excerpt(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {}", status);
    }
    let excerpt: String = body.chars().take(BODY_EXCERPT_LIMIT).collect();
    format!("HTTP {}: {}", status, excerpt)
}

/// 移除結尾的斜線，避免組出 `//v1/...`
pub fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
