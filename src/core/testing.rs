//! 核心模組單元測試共用的假實作

use crate::domain::model::{
    AuthToken, Destination, FareQuote, LocationCandidate, OfferQuery, Subscriber,
};
use crate::domain::ports::{
    DestinationStore, EmailChannel, FlightProvider, SmsChannel, SubscriberStore,
};
use crate::utils::error::{FareWatchError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn quote(code: &str, price: Decimal, stop_count: u32) -> FareQuote {
    FareQuote {
        price,
        currency: "EUR".to_string(),
        origin_code: "CDG".to_string(),
        destination_code: code.to_string(),
        departure_date: date(2026, 4, 1),
        return_date: date(2026, 4, 8),
        stop_count,
        via_code: (stop_count > 0).then(|| "IST".to_string()),
    }
}

pub fn city(code: &str) -> LocationCandidate {
    LocationCandidate {
        iata_code: code.to_string(),
        subtype: "CITY".to_string(),
        name: None,
    }
}

#[derive(Default)]
pub struct FakeProvider {
    pub token_calls: AtomicUsize,
    pub expires_in: i64,
    pub reject_credentials: bool,
    /// 之後幾次航班搜尋回傳 TokenRejected
    pub rejections_left: AtomicUsize,
    pub locations: HashMap<String, Vec<LocationCandidate>>,
    pub malformed_locations: HashSet<String>,
    pub offers: HashMap<String, Vec<FareQuote>>,
    pub failing_offers: HashSet<String>,
    pub location_calls: Mutex<Vec<String>>,
    pub offer_tokens: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            expires_in: 1799,
            ..Default::default()
        }
    }

    pub fn with_location(mut self, keyword: &str, candidates: Vec<LocationCandidate>) -> Self {
        self.locations.insert(keyword.to_ascii_uppercase(), candidates);
        self
    }

    pub fn with_offers(mut self, code: &str, offers: Vec<FareQuote>) -> Self {
        self.offers.insert(code.to_string(), offers);
        self
    }

    pub fn with_malformed_location(mut self, keyword: &str) -> Self {
        self.malformed_locations.insert(keyword.to_ascii_uppercase());
        self
    }

    pub fn with_failing_offers(mut self, code: &str) -> Self {
        self.failing_offers.insert(code.to_string());
        self
    }

    pub fn location_calls(&self) -> Vec<String> {
        self.location_calls.lock().unwrap().clone()
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn offer_calls(&self) -> usize {
        self.offer_tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl FlightProvider for FakeProvider {
    async fn request_token(&self) -> Result<AuthToken> {
        let n = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_credentials {
            return Err(FareWatchError::AuthError {
                message: "401 invalid_client".to_string(),
            });
        }
        Ok(AuthToken::from_expires_in(
            format!("token-{}", n),
            self.expires_in,
            Utc::now(),
        ))
    }

    async fn search_locations(
        &self,
        _token: &AuthToken,
        keyword: &str,
    ) -> Result<Vec<LocationCandidate>> {
        let keyword = keyword.to_ascii_uppercase();
        self.location_calls.lock().unwrap().push(keyword.clone());
        if self.malformed_locations.contains(&keyword) {
            return Err(FareWatchError::CodeResolutionError {
                city: keyword,
                message: "malformed location response".to_string(),
            });
        }
        Ok(self.locations.get(&keyword).cloned().unwrap_or_default())
    }

    async fn search_offers(&self, token: &AuthToken, query: &OfferQuery) -> Result<Vec<FareQuote>> {
        self.offer_tokens
            .lock()
            .unwrap()
            .push(token.value().to_string());
        let left = self.rejections_left.load(Ordering::SeqCst);
        if left > 0 {
            self.rejections_left.store(left - 1, Ordering::SeqCst);
            return Err(FareWatchError::TokenRejected {
                message: "401 invalid access token".to_string(),
            });
        }
        if self.failing_offers.contains(&query.destination_code) {
            return Err(FareWatchError::FareLookupError {
                destination: query.destination_code.clone(),
                message: "500 internal error".to_string(),
            });
        }
        Ok(self
            .offers
            .get(&query.destination_code)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub destinations: Vec<Destination>,
    /// 在這些位置插入無法解析的列
    pub invalid_rows: Vec<usize>,
    pub added_rows: Mutex<Vec<(Option<String>, Map<String, Value>)>>,
    pub fail_list: bool,
    pub fail_updates: bool,
    pub updates: Mutex<Vec<(u64, String)>>,
    pub subscribers: Vec<Subscriber>,
    pub fail_subscribers: bool,
    pub subscriber_calls: AtomicUsize,
}

impl FakeStore {
    pub fn with_destinations(destinations: Vec<Destination>) -> Self {
        Self {
            destinations,
            ..Default::default()
        }
    }

    pub fn with_subscribers(mut self, emails: &[&str]) -> Self {
        self.subscribers = emails
            .iter()
            .map(|email| Subscriber {
                email_address: email.to_string(),
            })
            .collect();
        self
    }

    pub fn with_invalid_row_at(mut self, position: usize) -> Self {
        self.invalid_rows.push(position);
        self
    }

    pub fn updates(&self) -> Vec<(u64, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn added_rows(&self) -> Vec<(Option<String>, Map<String, Value>)> {
        self.added_rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationStore for FakeStore {
    async fn list_destinations(&self) -> Result<Vec<Result<Destination>>> {
        if self.fail_list {
            return Err(FareWatchError::StoreError {
                message: "503 sheet unavailable".to_string(),
            });
        }
        let mut rows: Vec<Result<Destination>> =
            self.destinations.iter().cloned().map(Ok).collect();
        for &position in &self.invalid_rows {
            let at = position.min(rows.len());
            rows.insert(
                at,
                Err(FareWatchError::InvalidDestinationError {
                    id: format!("#{}", at + 1),
                    reason: "row has no numeric id".to_string(),
                }),
            );
        }
        Ok(rows)
    }

    async fn update_iata_code(&self, id: u64, iata_code: &str) -> Result<()> {
        if self.fail_updates {
            return Err(FareWatchError::StoreError {
                message: "PUT returned 500".to_string(),
            });
        }
        self.updates
            .lock()
            .unwrap()
            .push((id, iata_code.to_string()));
        Ok(())
    }

    async fn add_row(&self, row: &Map<String, Value>, row_key: Option<&str>) -> Result<Value> {
        self.added_rows
            .lock()
            .unwrap()
            .push((row_key.map(str::to_string), row.clone()));
        Ok(json!({ "price": row }))
    }
}

#[async_trait]
impl SubscriberStore for FakeStore {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        self.subscriber_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribers {
            return Err(FareWatchError::StoreError {
                message: "users tab unavailable".to_string(),
            });
        }
        Ok(self.subscribers.clone())
    }
}

#[derive(Default)]
pub struct FakeSms {
    pub fail: bool,
    pub sent: Mutex<Vec<String>>,
}

impl FakeSms {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsChannel for FakeSms {
    async fn send_sms(&self, body: &str) -> Result<String> {
        self.sent.lock().unwrap().push(body.to_string());
        if self.fail {
            return Err(FareWatchError::NotificationError {
                channel: "sms".to_string(),
                message: "400 invalid 'To' number".to_string(),
            });
        }
        Ok(format!("SM{}", self.sent.lock().unwrap().len()))
    }
}

#[derive(Default)]
pub struct FakeEmail {
    pub failing_recipients: HashSet<String>,
    pub sent: Mutex<Vec<(String, String, String)>>,
}

impl FakeEmail {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing_recipients: recipients.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(to, _, _)| to.clone())
            .collect()
    }
}

#[async_trait]
impl EmailChannel for FakeEmail {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        if self.failing_recipients.contains(recipient) {
            return Err(FareWatchError::NotificationError {
                channel: format!("email:{}", recipient),
                message: "422 inactive recipient".to_string(),
            });
        }
        Ok(())
    }
}
