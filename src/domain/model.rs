use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::error::{FareWatchError, Result};
use crate::utils::validation::{is_iata_code, Validate};

/// 試算表中的一列目的地
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: u64,
    pub city_name: String,
    pub iata_code: Option<String>,
    pub target_price: Decimal,
}

impl Destination {
    pub fn new(id: u64, city_name: impl Into<String>, target_price: Decimal) -> Self {
        Self {
            id,
            city_name: city_name.into(),
            iata_code: None,
            target_price,
        }
    }

    pub fn with_iata_code(mut self, code: impl Into<String>) -> Self {
        self.iata_code = Some(code.into().to_ascii_uppercase());
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.iata_code.as_deref().is_some_and(is_iata_code)
    }

    /// 日誌與摘要用的名稱，例如 `Tokyo (TYO)`
    pub fn label(&self) -> String {
        match &self.iata_code {
            Some(code) => format!("{} ({})", self.city_name, code),
            None => self.city_name.clone(),
        }
    }
}

impl Validate for Destination {
    fn validate(&self) -> Result<()> {
        if self.city_name.trim().is_empty() {
            return Err(FareWatchError::InvalidDestinationError {
                id: self.id.to_string(),
                reason: "city name is empty".to_string(),
            });
        }
        if self.target_price <= Decimal::ZERO {
            return Err(FareWatchError::InvalidDestinationError {
                id: self.id.to_string(),
                reason: format!(
                    "target price must be greater than zero (got {})",
                    self.target_price
                ),
            });
        }
        if let Some(code) = &self.iata_code {
            if !is_iata_code(code) {
                return Err(FareWatchError::InvalidDestinationError {
                    id: self.id.to_string(),
                    reason: format!("'{}' is not a valid IATA code", code),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email_address: String,
}

/// 供應商回傳的單一報價，建立後不可變
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareQuote {
    pub price: Decimal,
    pub currency: String,
    pub origin_code: String,
    pub destination_code: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub stop_count: u32,
    pub via_code: Option<String>,
}

impl FareQuote {
    pub fn is_direct(&self) -> bool {
        self.stop_count == 0
    }
}

/// 低於目標價的報價。只能透過 [`Deal::new`] 建立。
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    destination: Destination,
    fare_quote: FareQuote,
}

impl Deal {
    /// 目的地尚未取得 IATA 代碼或價格不低於目標價時回傳 `None`
    pub fn new(destination: Destination, fare_quote: FareQuote) -> Option<Self> {
        if !destination.is_resolved() || fare_quote.price >= destination.target_price {
            return None;
        }
        Some(Self {
            destination,
            fare_quote,
        })
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn fare_quote(&self) -> &FareQuote {
        &self.fare_quote
    }

    pub fn savings(&self) -> Decimal {
        self.destination.target_price - self.fare_quote.price
    }
}

/// 提前刷新的安全邊際
pub const TOKEN_EXPIRY_MARGIN_SECONDS: i64 = 10;

#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// 依照 `expires_in` 秒數建立 token，扣除安全邊際
    pub fn from_expires_in(value: impl Into<String>, expires_in: i64, now: DateTime<Utc>) -> Self {
        let lifetime = Duration::seconds(expires_in - TOKEN_EXPIRY_MARGIN_SECONDS);
        Self::new(value, now + lifetime)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCandidate {
    pub iata_code: String,
    pub subtype: String,
    pub name: Option<String>,
}

/// 一次來回航班搜尋的參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferQuery {
    pub origin_code: String,
    pub destination_code: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub adults: u32,
    pub currency: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationFailure {
    pub destination: String,
    pub kind: String,
    pub message: String,
}

/// 一次執行的摘要，也是唯一的可觀察輸出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub destinations_processed: usize,
    pub codes_resolved: usize,
    pub deals_found: usize,
    pub no_deal: usize,
    pub sms_sent: usize,
    pub emails_sent: usize,
    pub errors: Vec<DestinationFailure>,
}

impl RunSummary {
    pub fn record_error(&mut self, destination: impl Into<String>, error: &FareWatchError) {
        self.errors.push(DestinationFailure {
            destination: destination.into(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
