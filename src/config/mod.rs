#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::{FareWatchError, Result};
use crate::utils::validation::{
    parse_iso_date, validate_email_address, validate_iata_code, validate_non_empty_string,
    validate_range, validate_required_field, validate_trip_window, validate_url, Validate,
};
use chrono::{Days, NaiveDate};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_AMADEUS_BASE_URL: &str = "https://test.api.amadeus.com";
pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_ORIGIN_IATA: &str = "CDG";
pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 20;
pub const MAX_TIMEOUT_SECONDS: u64 = 120;
/// 預設出發日：今天起約六個月
pub const DEFAULT_DEPARTURE_OFFSET_DAYS: u64 = 182;
pub const DEFAULT_TRIP_LENGTH_DAYS: u64 = 7;

/// 把 `.env` 載入行程環境變數；已存在的變數不會被覆寫，重複呼叫無副作用
pub fn load_dotenv(path: Option<&Path>) -> bool {
    match path {
        Some(path) => dotenvy::from_path(path).is_ok(),
        None => dotenvy::dotenv().is_ok(),
    }
}

/// 未經處理的設定值，來源可以是環境變數或 TOML 檔
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub sheety_prices_endpoint: Option<String>,
    pub sheety_users_endpoint: Option<String>,
    pub sheety_token: Option<String>,
    pub sheety_username: Option<String>,
    pub sheety_password: Option<String>,
    pub sheety_data_key: Option<String>,
    pub sheety_users_key: Option<String>,
    pub amadeus_base_url: Option<String>,
    pub amadeus_api_key: Option<String>,
    pub amadeus_api_secret: Option<String>,
    pub origin_iata: Option<String>,
    pub currency: Option<String>,
    pub default_departure_date: Option<String>,
    pub default_return_date: Option<String>,
    pub twilio_base_url: Option<String>,
    pub twilio_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from: Option<String>,
    pub twilio_to: Option<String>,
    pub email_sender: Option<String>,
    pub email_password: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
    pub email_api_url: Option<String>,
    pub email_api_token: Option<String>,
    pub request_timeout_seconds: Option<String>,
}

impl RawSettings {
    /// 讀取 `.env` 後再讀取行程環境變數
    pub fn from_env(dotenv_path: Option<&Path>) -> Self {
        if load_dotenv(dotenv_path) {
            tracing::debug!("Loaded variables from .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 以任意查詢函式建立，方便測試時不改動真實環境
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            // SHEETY_ENDPOINT 為舊版名稱
            sheety_prices_endpoint: get("SHEETY_PRICES_ENDPOINT").or_else(|| get("SHEETY_ENDPOINT")),
            sheety_users_endpoint: get("SHEETY_USERS_ENDPOINT"),
            sheety_token: get("SHEETY_TOKEN"),
            sheety_username: get("SHEETY_USERNAME"),
            sheety_password: get("SHEETY_PASSWORD"),
            sheety_data_key: get("SHEETY_DATA_KEY"),
            sheety_users_key: get("SHEETY_USERS_KEY"),
            amadeus_base_url: get("AMADEUS_BASE_URL"),
            amadeus_api_key: get("AMADEUS_API_KEY"),
            amadeus_api_secret: get("AMADEUS_API_SECRET"),
            origin_iata: get("ORIGIN_IATA"),
            currency: get("CURRENCY"),
            default_departure_date: get("DEFAULT_DEPARTURE_DATE"),
            default_return_date: get("DEFAULT_RETURN_DATE"),
            twilio_base_url: get("TWILIO_BASE_URL"),
            twilio_sid: get("TWILIO_SID"),
            twilio_auth_token: get("TWILIO_AUTH_TOKEN"),
            twilio_from: get("TWILIO_FROM"),
            twilio_to: get("TWILIO_TO"),
            email_sender: get("EMAIL_SENDER"),
            email_password: get("EMAIL_PASSWORD"),
            smtp_host: get("SMTP_HOST"),
            smtp_port: get("SMTP_PORT"),
            email_api_url: get("EMAIL_API_URL"),
            email_api_token: get("EMAIL_API_TOKEN"),
            request_timeout_seconds: get("REQUEST_TIMEOUT_SECONDS"),
        }
    }

    /// `self` 的值優先，缺少的欄位由 `fallback` 補上
    pub fn merge(self, fallback: RawSettings) -> Self {
        Self {
            sheety_prices_endpoint: self.sheety_prices_endpoint.or(fallback.sheety_prices_endpoint),
            sheety_users_endpoint: self.sheety_users_endpoint.or(fallback.sheety_users_endpoint),
            sheety_token: self.sheety_token.or(fallback.sheety_token),
            sheety_username: self.sheety_username.or(fallback.sheety_username),
            sheety_password: self.sheety_password.or(fallback.sheety_password),
            sheety_data_key: self.sheety_data_key.or(fallback.sheety_data_key),
            sheety_users_key: self.sheety_users_key.or(fallback.sheety_users_key),
            amadeus_base_url: self.amadeus_base_url.or(fallback.amadeus_base_url),
            amadeus_api_key: self.amadeus_api_key.or(fallback.amadeus_api_key),
            amadeus_api_secret: self.amadeus_api_secret.or(fallback.amadeus_api_secret),
            origin_iata: self.origin_iata.or(fallback.origin_iata),
            currency: self.currency.or(fallback.currency),
            default_departure_date: self.default_departure_date.or(fallback.default_departure_date),
            default_return_date: self.default_return_date.or(fallback.default_return_date),
            twilio_base_url: self.twilio_base_url.or(fallback.twilio_base_url),
            twilio_sid: self.twilio_sid.or(fallback.twilio_sid),
            twilio_auth_token: self.twilio_auth_token.or(fallback.twilio_auth_token),
            twilio_from: self.twilio_from.or(fallback.twilio_from),
            twilio_to: self.twilio_to.or(fallback.twilio_to),
            email_sender: self.email_sender.or(fallback.email_sender),
            email_password: self.email_password.or(fallback.email_password),
            smtp_host: self.smtp_host.or(fallback.smtp_host),
            smtp_port: self.smtp_port.or(fallback.smtp_port),
            email_api_url: self.email_api_url.or(fallback.email_api_url),
            email_api_token: self.email_api_token.or(fallback.email_api_token),
            request_timeout_seconds: self
                .request_timeout_seconds
                .or(fallback.request_timeout_seconds),
        }
    }
}

#[derive(Debug)]
pub struct AmadeusSettings {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: SecretString,
    pub currency: String,
}

#[derive(Debug)]
pub struct TwilioSettings {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
    pub to_number: String,
}

/// 以 SMTP（STARTTLS）登入寄信，寄件人同時是登入帳號
#[derive(Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub sender: String,
    pub password: SecretString,
    pub timeout: Duration,
}

/// HTTP 郵件 API（Postmark 格式）
#[derive(Debug)]
pub struct EmailApiSettings {
    pub api_url: String,
    pub api_token: SecretString,
    pub sender: String,
}

#[derive(Debug)]
pub enum EmailSettings {
    Smtp(SmtpSettings),
    Api(EmailApiSettings),
}

/// 整個執行共用的設定，啟動時建立一次後以參照傳入各元件
#[derive(Debug)]
pub struct Settings {
    pub sheety_prices_endpoint: String,
    pub sheety_users_endpoint: Option<String>,
    pub sheety_token: Option<SecretString>,
    pub sheety_username: Option<String>,
    pub sheety_password: Option<SecretString>,
    pub sheety_data_key: String,
    pub sheety_users_key: String,
    pub amadeus_base_url: String,
    pub amadeus_api_key: Option<String>,
    pub amadeus_api_secret: Option<SecretString>,
    pub origin_iata: String,
    pub currency: String,
    pub default_departure_date: Option<NaiveDate>,
    pub default_return_date: Option<NaiveDate>,
    pub twilio_base_url: String,
    pub twilio_sid: Option<String>,
    pub twilio_auth_token: Option<SecretString>,
    pub twilio_from: Option<String>,
    pub twilio_to: Option<String>,
    pub email_sender: Option<String>,
    pub email_password: Option<SecretString>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub email_api_url: Option<String>,
    pub email_api_token: Option<SecretString>,
    pub request_timeout: Duration,
}

impl Settings {
    /// 從環境變數（與 `.env`）載入並驗證
    pub fn from_env(dotenv_path: Option<&Path>) -> Result<Self> {
        let settings = Self::from_raw(RawSettings::from_env(dotenv_path))?;
        settings.validate()?;
        Ok(settings)
    }

    /// TOML 檔的值覆蓋環境變數
    pub fn from_file_and_env<P: AsRef<Path>>(path: P, dotenv_path: Option<&Path>) -> Result<Self> {
        let file = toml_config::load_raw_settings(path)?;
        let settings = Self::from_raw(file.merge(RawSettings::from_env(dotenv_path)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_raw(raw: RawSettings) -> Result<Self> {
        let sheety_prices_endpoint =
            validate_required_field("SHEETY_PRICES_ENDPOINT", &raw.sheety_prices_endpoint)?
                .trim()
                .to_string();

        let request_timeout = match raw.request_timeout_seconds.as_deref() {
            Some(value) => {
                let seconds: u64 = value.trim().parse().map_err(|_| {
                    FareWatchError::InvalidConfigValueError {
                        field: "REQUEST_TIMEOUT_SECONDS".to_string(),
                        value: value.to_string(),
                        reason: "must be an integer number of seconds".to_string(),
                    }
                })?;
                validate_range("REQUEST_TIMEOUT_SECONDS", seconds, 1, MAX_TIMEOUT_SECONDS)?;
                Duration::from_secs(seconds)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        };

        let smtp_port = match raw.smtp_port.as_deref() {
            Some(value) => {
                let port: u16 = value.trim().parse().map_err(|_| {
                    FareWatchError::InvalidConfigValueError {
                        field: "SMTP_PORT".to_string(),
                        value: value.to_string(),
                        reason: "must be an integer between 1 and 65535".to_string(),
                    }
                })?;
                validate_range("SMTP_PORT", port, 1, u16::MAX)?;
                port
            }
            None => DEFAULT_SMTP_PORT,
        };

        let default_departure_date = raw
            .default_departure_date
            .as_deref()
            .map(|value| parse_iso_date("DEFAULT_DEPARTURE_DATE", value))
            .transpose()?;
        let default_return_date = raw
            .default_return_date
            .as_deref()
            .map(|value| parse_iso_date("DEFAULT_RETURN_DATE", value))
            .transpose()?;

        Ok(Self {
            sheety_prices_endpoint,
            sheety_users_endpoint: raw.sheety_users_endpoint,
            sheety_token: raw.sheety_token.map(SecretString::from),
            sheety_username: raw.sheety_username,
            sheety_password: raw.sheety_password.map(SecretString::from),
            sheety_data_key: raw.sheety_data_key.unwrap_or_else(|| "prices".to_string()),
            sheety_users_key: raw.sheety_users_key.unwrap_or_else(|| "users".to_string()),
            amadeus_base_url: raw
                .amadeus_base_url
                .unwrap_or_else(|| DEFAULT_AMADEUS_BASE_URL.to_string()),
            amadeus_api_key: raw.amadeus_api_key,
            amadeus_api_secret: raw.amadeus_api_secret.map(SecretString::from),
            origin_iata: raw
                .origin_iata
                .unwrap_or_else(|| DEFAULT_ORIGIN_IATA.to_string())
                .trim()
                .to_ascii_uppercase(),
            currency: raw
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
                .trim()
                .to_ascii_uppercase(),
            default_departure_date,
            default_return_date,
            twilio_base_url: raw
                .twilio_base_url
                .unwrap_or_else(|| DEFAULT_TWILIO_BASE_URL.to_string()),
            twilio_sid: raw.twilio_sid,
            twilio_auth_token: raw.twilio_auth_token.map(SecretString::from),
            twilio_from: raw.twilio_from,
            twilio_to: raw.twilio_to,
            email_sender: raw.email_sender.map(|sender| sender.trim().to_string()),
            email_password: raw.email_password.map(SecretString::from),
            smtp_host: raw
                .smtp_host
                .map(|host| host.trim().to_string())
                .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port,
            email_api_url: raw.email_api_url,
            email_api_token: raw.email_api_token.map(SecretString::from),
            request_timeout,
        })
    }

    /// `--sync-iata` 與 `--search` 需要 Amadeus 憑證
    pub fn amadeus(&self) -> Result<AmadeusSettings> {
        let api_key = validate_required_field("AMADEUS_API_KEY", &self.amadeus_api_key)?;
        let api_secret = validate_required_field("AMADEUS_API_SECRET", &self.amadeus_api_secret)?;
        Ok(AmadeusSettings {
            base_url: self.amadeus_base_url.clone(),
            api_key: api_key.clone(),
            api_secret: SecretString::from(api_secret.expose_secret().to_owned()),
            currency: self.currency.clone(),
        })
    }

    /// `--notify` 需要完整的 Twilio 設定
    pub fn twilio(&self) -> Result<TwilioSettings> {
        let account_sid = validate_required_field("TWILIO_SID", &self.twilio_sid)?;
        let auth_token = validate_required_field("TWILIO_AUTH_TOKEN", &self.twilio_auth_token)?;
        let from_number = validate_required_field("TWILIO_FROM", &self.twilio_from)?;
        let to_number = validate_required_field("TWILIO_TO", &self.twilio_to)?;
        Ok(TwilioSettings {
            base_url: self.twilio_base_url.clone(),
            account_sid: account_sid.clone(),
            auth_token: SecretString::from(auth_token.expose_secret().to_owned()),
            from_number: from_number.clone(),
            to_number: to_number.clone(),
        })
    }

    /// 電子郵件為選用功能：有 `EMAIL_PASSWORD` 時走 SMTP，
    /// 否則有 `EMAIL_API_*` 時走 HTTP API，兩者皆無時回傳 `None`
    pub fn email(&self) -> Option<EmailSettings> {
        let sender = self.email_sender.as_ref()?;
        if let Some(password) = &self.email_password {
            return Some(EmailSettings::Smtp(SmtpSettings {
                host: self.smtp_host.clone(),
                port: self.smtp_port,
                sender: sender.clone(),
                password: SecretString::from(password.expose_secret().to_owned()),
                timeout: self.request_timeout,
            }));
        }
        match (&self.email_api_url, &self.email_api_token) {
            (Some(api_url), Some(api_token)) => Some(EmailSettings::Api(EmailApiSettings {
                api_url: api_url.clone(),
                api_token: SecretString::from(api_token.expose_secret().to_owned()),
                sender: sender.clone(),
            })),
            _ => None,
        }
    }

    /// 決定搜尋的出發與回程日期：命令列 > 設定 > 今天 + 182 天、停留 7 天
    pub fn trip_window(
        &self,
        departure_override: Option<NaiveDate>,
        return_override: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let departure = departure_override.or(self.default_departure_date);
        let return_date = return_override.or(self.default_return_date);

        let (departure, return_date) = match (departure, return_date) {
            (Some(departure), Some(return_date)) => (departure, return_date),
            (partial_departure, partial_return) => {
                if partial_departure.is_some() || partial_return.is_some() {
                    tracing::warn!(
                        "⚠️ Only one of departure/return date was set; ignoring it and using the default window ({} days ahead, {}-day stay)",
                        DEFAULT_DEPARTURE_OFFSET_DAYS,
                        DEFAULT_TRIP_LENGTH_DAYS
                    );
                }
                let departure = today
                    .checked_add_days(Days::new(DEFAULT_DEPARTURE_OFFSET_DAYS))
                    .ok_or_else(|| FareWatchError::ConfigError {
                        message: "could not compute default departure date".to_string(),
                    })?;
                let return_date = departure
                    .checked_add_days(Days::new(DEFAULT_TRIP_LENGTH_DAYS))
                    .ok_or_else(|| FareWatchError::ConfigError {
                        message: "could not compute default return date".to_string(),
                    })?;
                (departure, return_date)
            }
        };

        validate_trip_window(departure, return_date)?;
        Ok((departure, return_date))
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("SHEETY_PRICES_ENDPOINT", &self.sheety_prices_endpoint)?;
        if let Some(users) = &self.sheety_users_endpoint {
            validate_url("SHEETY_USERS_ENDPOINT", users)?;
        }
        validate_non_empty_string("SHEETY_DATA_KEY", &self.sheety_data_key)?;
        validate_non_empty_string("SHEETY_USERS_KEY", &self.sheety_users_key)?;
        validate_url("AMADEUS_BASE_URL", &self.amadeus_base_url)?;
        validate_url("TWILIO_BASE_URL", &self.twilio_base_url)?;
        if let Some(api_url) = &self.email_api_url {
            validate_url("EMAIL_API_URL", api_url)?;
        }
        if let Some(sender) = &self.email_sender {
            validate_email_address("EMAIL_SENDER", sender)?;
        }
        if self.email_password.is_some() {
            validate_required_field("EMAIL_SENDER", &self.email_sender)?;
            validate_non_empty_string("SMTP_HOST", &self.smtp_host)?;
        }
        validate_iata_code("ORIGIN_IATA", &self.origin_iata)?;
        if self.currency.len() != 3 {
            return Err(FareWatchError::InvalidConfigValueError {
                field: "CURRENCY".to_string(),
                value: self.currency.clone(),
                reason: "Expected a three-letter ISO 4217 code".to_string(),
            });
        }
        if let (Some(departure), Some(return_date)) =
            (self.default_departure_date, self.default_return_date)
        {
            validate_trip_window(departure, return_date)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
