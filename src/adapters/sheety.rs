use crate::adapters::http::error_excerpt;
use crate::config::Settings;
use crate::domain::model::{Destination, Subscriber};
use crate::domain::ports::{DestinationStore, SubscriberStore};
use crate::utils::error::{FareWatchError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// 試算表 REST API 的認證方式
#[derive(Debug)]
pub enum SheetAuth {
    None,
    Bearer(SecretString),
    Basic {
        username: String,
        password: SecretString,
    },
}

/// Sheety 風格的試算表客戶端：`prices` 分頁存目的地，`users` 分頁存訂閱者
pub struct SheetClient {
    client: Client,
    prices_endpoint: String,
    users_endpoint: Option<String>,
    data_key: String,
    users_key: String,
    auth: SheetAuth,
}

impl SheetClient {
    pub fn new(client: Client, prices_endpoint: impl Into<String>) -> Self {
        Self {
            client,
            prices_endpoint: prices_endpoint.into().trim_end_matches('/').to_string(),
            users_endpoint: None,
            data_key: "prices".to_string(),
            users_key: "users".to_string(),
            auth: SheetAuth::None,
        }
    }

    pub fn from_settings(client: Client, settings: &Settings) -> Self {
        let auth = match (
            &settings.sheety_token,
            &settings.sheety_username,
            &settings.sheety_password,
        ) {
            (Some(token), _, _) => SheetAuth::Bearer(SecretString::from(
                token.expose_secret().to_owned(),
            )),
            (None, Some(username), Some(password)) => SheetAuth::Basic {
                username: username.clone(),
                password: SecretString::from(password.expose_secret().to_owned()),
            },
            _ => SheetAuth::None,
        };

        let mut sheet = Self::new(client, settings.sheety_prices_endpoint.clone())
            .with_data_key(settings.sheety_data_key.clone())
            .with_users_key(settings.sheety_users_key.clone())
            .with_auth(auth);
        if let Some(users_endpoint) = &settings.sheety_users_endpoint {
            sheet = sheet.with_users_endpoint(users_endpoint.clone());
        }
        sheet
    }

    pub fn with_users_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.users_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = key.into();
        self
    }

    pub fn with_users_key(mut self, key: impl Into<String>) -> Self {
        self.users_key = key.into();
        self
    }

    pub fn with_auth(mut self, auth: SheetAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn has_users_endpoint(&self) -> bool {
        self.users_endpoint.is_some()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            SheetAuth::None => request,
            SheetAuth::Bearer(token) => request.bearer_auth(token.expose_secret()),
            SheetAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
        }
    }

    /// 單列資料的包裝鍵，例如 `prices` → `price`
    fn row_key(&self) -> &str {
        match self.data_key.strip_suffix('s') {
            Some(singular) if !singular.is_empty() => singular,
            _ => &self.data_key,
        }
    }

    async fn get_rows(&self, endpoint: &str, key: &str) -> Result<Vec<Value>> {
        tracing::debug!("📡 Fetching sheet rows from: {}", endpoint);
        let response = self
            .authorize(self.client.get(endpoint))
            .send()
            .await
            .map_err(|e| FareWatchError::StoreError {
                message: format!("GET {} failed: {}", endpoint, e),
            })?;

        if !response.status().is_success() {
            return Err(FareWatchError::StoreError {
                message: format!("GET {} returned {}", endpoint, error_excerpt(response).await),
            });
        }

        let payload: Value = response.json().await.map_err(|e| FareWatchError::StoreError {
            message: format!("sheet response is not valid JSON: {}", e),
        })?;
        extract_rows(payload, key)
    }
}

/// 取出 `{ "<key>": [ ... ] }` 中的陣列；整個回應本身是陣列時直接使用
fn extract_rows(payload: Value, key: &str) -> Result<Vec<Value>> {
    match payload {
        Value::Object(mut obj) => match obj.remove(key) {
            Some(Value::Array(rows)) => Ok(rows),
            Some(_) => Err(FareWatchError::StoreError {
                message: format!("'{}' in sheet response is not a list", key),
            }),
            None => Err(FareWatchError::StoreError {
                message: format!("sheet response has no '{}' key", key),
            }),
        },
        Value::Array(rows) => Ok(rows),
        _ => Err(FareWatchError::StoreError {
            message: "unexpected sheet response shape".to_string(),
        }),
    }
}

fn first_field<'a>(row: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| row.get(*name))
        .find(|value| !value.is_null())
}

fn value_as_trimmed_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    value_as_trimmed_str(value).and_then(|s| Decimal::from_str(&s).ok())
}

/// `index` 從 1 起算，與錯誤訊息中的列號一致
pub(crate) fn parse_destination_row(index: usize, row: &Value) -> Result<Destination> {
    let invalid = |reason: &str| FareWatchError::InvalidDestinationError {
        id: format!("#{}", index),
        reason: reason.to_string(),
    };

    let obj = row.as_object().ok_or_else(|| invalid("row is not an object"))?;

    let id = first_field(obj, &["id"])
        .and_then(value_as_trimmed_str)
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| invalid("row has no numeric id"))?;

    let city_name = first_field(obj, &["city", "destination"])
        .and_then(value_as_trimmed_str)
        .unwrap_or_default();

    let iata_code = first_field(obj, &["iataCode", "iata_code"])
        .and_then(value_as_trimmed_str)
        .map(|code| code.to_ascii_uppercase());

    // 缺少或無法解析的價格以 0 表示，之後在驗證時回報
    let target_price = first_field(obj, &["lowestPrice", "lowest_price", "targetPrice"])
        .and_then(parse_decimal)
        .unwrap_or(Decimal::ZERO);

    Ok(Destination {
        id,
        city_name,
        iata_code,
        target_price,
    })
}

#[async_trait]
impl DestinationStore for SheetClient {
    async fn list_destinations(&self) -> Result<Vec<Result<Destination>>> {
        let rows = self.get_rows(&self.prices_endpoint, &self.data_key).await?;
        let destinations: Vec<Result<Destination>> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| parse_destination_row(index + 1, row))
            .collect();

        tracing::debug!("Fetched {} destination rows", destinations.len());
        Ok(destinations)
    }

    async fn update_iata_code(&self, id: u64, iata_code: &str) -> Result<()> {
        let endpoint = format!("{}/{}", self.prices_endpoint, id);
        let mut wrapper = Map::new();
        wrapper.insert(self.row_key().to_string(), json!({ "iataCode": iata_code }));
        let body = Value::Object(wrapper);

        tracing::debug!("📡 Writing IATA code {} to row {}", iata_code, id);
        let response = self
            .authorize(self.client.put(&endpoint).json(&body))
            .send()
            .await
            .map_err(|e| FareWatchError::StoreError {
                message: format!("PUT {} failed: {}", endpoint, e),
            })?;

        if !response.status().is_success() {
            return Err(FareWatchError::StoreError {
                message: format!("PUT {} returned {}", endpoint, error_excerpt(response).await),
            });
        }
        Ok(())
    }

    async fn add_row(&self, row: &Map<String, Value>, row_key: Option<&str>) -> Result<Value> {
        let key = row_key.unwrap_or_else(|| self.row_key());
        let mut wrapper = Map::new();
        wrapper.insert(key.to_string(), Value::Object(row.clone()));
        let body = Value::Object(wrapper);

        tracing::debug!("📡 Adding row under '{}' to {}", key, self.prices_endpoint);
        let response = self
            .authorize(self.client.post(&self.prices_endpoint).json(&body))
            .send()
            .await
            .map_err(|e| FareWatchError::StoreError {
                message: format!("POST {} failed: {}", self.prices_endpoint, e),
            })?;

        if !response.status().is_success() {
            return Err(FareWatchError::StoreError {
                message: format!(
                    "POST {} returned {}",
                    self.prices_endpoint,
                    error_excerpt(response).await
                ),
            });
        }

        response.json().await.map_err(|e| FareWatchError::StoreError {
            message: format!("sheet response is not valid JSON: {}", e),
        })
    }
}

#[async_trait]
impl SubscriberStore for SheetClient {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let endpoint = self
            .users_endpoint
            .as_deref()
            .ok_or_else(|| FareWatchError::MissingConfigError {
                field: "SHEETY_USERS_ENDPOINT".to_string(),
            })?;

        let rows = self.get_rows(endpoint, &self.users_key).await?;
        let subscribers: Vec<Subscriber> = rows
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|row| first_field(row, &["email", "emailAddress", "email_address"]))
            .filter_map(value_as_trimmed_str)
            .map(|email_address| Subscriber { email_address })
            .collect();

        tracing::debug!("Fetched {} subscribers", subscribers.len());
        Ok(subscribers)
    }
}
