use crate::domain::model::AuthToken;
use crate::domain::ports::FlightProvider;
use crate::utils::error::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 一次執行期間共用的 bearer token。
///
/// 鎖會跨越認證請求持有，同一時間最多只有一個重新認證在進行。
pub struct AuthTokenCache {
    provider: Arc<dyn FlightProvider>,
    cached: Mutex<Option<AuthToken>>,
}

impl AuthTokenCache {
    pub fn new(provider: Arc<dyn FlightProvider>) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
        }
    }

    /// 回傳快取中的 token；尚未取得或已過期時重新認證
    pub async fn get_token(&self) -> Result<AuthToken> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired(Utc::now()) {
                return Ok(token.clone());
            }
            tracing::debug!("🔑 Cached token expired, re-authenticating");
        }

        let token = self.provider.request_token().await?;
        tracing::debug!("🔑 Obtained access token, expires at {}", token.expires_at());
        *cached = Some(token.clone());
        Ok(token)
    }

    /// 供應商拒絕 `rejected` 後強制刷新。
    /// 若快取已被換成別的 token，直接回傳新的，不重複認證。
    pub async fn refresh(&self, rejected: &AuthToken) -> Result<AuthToken> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token != rejected && !token.is_expired(Utc::now()) {
                return Ok(token.clone());
            }
        }

        tracing::info!("🔑 Provider rejected the access token, re-authenticating");
        *cached = None;
        let token = self.provider.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
