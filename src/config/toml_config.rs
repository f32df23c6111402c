use crate::config::RawSettings;
use crate::utils::error::{FareWatchError, Result};
use regex::Regex;
use std::path::Path;

/// 從 TOML 檔案載入設定
///
/// 檔案使用與環境變數相同的鍵名（小寫），例如：
///
/// ```toml
/// sheety_prices_endpoint = "https://api.sheety.co/abc/flightDeals/prices"
/// amadeus_api_key = "${AMADEUS_API_KEY}"
/// origin_iata = "LHR"
/// request_timeout_seconds = 15
/// ```
pub fn load_raw_settings<P: AsRef<Path>>(path: P) -> Result<RawSettings> {
    let content = std::fs::read_to_string(&path).map_err(FareWatchError::IoError)?;
    parse_raw_settings(&content)
}

/// 從 TOML 字串解析設定
pub fn parse_raw_settings(content: &str) -> Result<RawSettings> {
    let processed_content = substitute_env_vars(content)?;

    let table: toml::Table =
        toml::from_str(&processed_content).map_err(|e| FareWatchError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })?;

    for key in table.keys() {
        if !is_known_key(key) {
            tracing::warn!("⚠️ Ignoring unknown configuration key '{}'", key);
        }
    }

    Ok(RawSettings::from_lookup(|key| {
        table
            .get(&key.to_ascii_lowercase())
            .and_then(scalar_to_string)
            // 未被替換的 ${VAR} 視為未設定
            .filter(|value| !(value.starts_with("${") && value.ends_with('}')))
    }))
}

/// 替換環境變數 (例如 ${AMADEUS_API_KEY})
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FareWatchError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

const KNOWN_KEYS: &[&str] = &[
    "sheety_prices_endpoint",
    "sheety_endpoint",
    "sheety_users_endpoint",
    "sheety_token",
    "sheety_username",
    "sheety_password",
    "sheety_data_key",
    "sheety_users_key",
    "amadeus_base_url",
    "amadeus_api_key",
    "amadeus_api_secret",
    "origin_iata",
    "currency",
    "default_departure_date",
    "default_return_date",
    "twilio_base_url",
    "twilio_sid",
    "twilio_auth_token",
    "twilio_from",
    "twilio_to",
    "email_api_url",
    "email_api_token",
    "email_sender",
    "email_password",
    "smtp_host",
    "smtp_port",
    "request_timeout_seconds",
];

fn is_known_key(key: &str) -> bool {
    KNOWN_KEYS.contains(&key)
}
