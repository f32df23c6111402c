use crate::domain::model::{
    AuthToken, Destination, FareQuote, LocationCandidate, OfferQuery, Subscriber,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// 目的地資料來源（試算表）
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// 依試算表順序回傳每一列；無法解析的列以 `InvalidDestinationError` 表示，
    /// 只有整個讀取失敗時才回傳外層錯誤
    async fn list_destinations(&self) -> Result<Vec<Result<Destination>>>;

    async fn update_iata_code(&self, id: u64, iata_code: &str) -> Result<()>;

    /// 新增一列，`row_key` 覆寫包裝鍵；回傳試算表的回應內容
    async fn add_row(&self, row: &Map<String, Value>, row_key: Option<&str>) -> Result<Value>;
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>>;
}

/// 航班搜尋供應商：認證、地點查詢、航班報價
#[async_trait]
pub trait FlightProvider: Send + Sync {
    async fn request_token(&self) -> Result<AuthToken>;

    async fn search_locations(
        &self,
        token: &AuthToken,
        keyword: &str,
    ) -> Result<Vec<LocationCandidate>>;

    async fn search_offers(&self, token: &AuthToken, query: &OfferQuery) -> Result<Vec<FareQuote>>;
}

#[async_trait]
pub trait SmsChannel: Send + Sync {
    /// 回傳供應商的送達確認 ID
    async fn send_sms(&self, body: &str) -> Result<String>;
}

#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}
