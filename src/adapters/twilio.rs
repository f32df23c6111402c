use crate::adapters::http::{error_excerpt, trim_base_url};
use crate::config::TwilioSettings;
use crate::domain::ports::SmsChannel;
use crate::utils::error::{FareWatchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

/// Twilio Messages API 的 SMS 通道
pub struct TwilioSms {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    to_number: String,
}

impl TwilioSms {
    pub fn new(client: Client, settings: TwilioSettings) -> Self {
        Self {
            client,
            base_url: trim_base_url(&settings.base_url),
            account_sid: settings.account_sid,
            auth_token: settings.auth_token,
            from_number: settings.from_number,
            to_number: settings.to_number,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    fn failure(message: String) -> FareWatchError {
        FareWatchError::NotificationError {
            channel: "sms".to_string(),
            message,
        }
    }
}

#[async_trait]
impl SmsChannel for TwilioSms {
    async fn send_sms(&self, body: &str) -> Result<String> {
        tracing::debug!("📱 Sending SMS to {}", self.to_number);

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[
                ("To", self.to_number.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| Self::failure(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::failure(error_excerpt(response).await));
        }

        let payload: MessageResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("malformed response: {}", e)))?;

        payload
            .sid
            .ok_or_else(|| Self::failure("response has no message sid".to_string()))
    }
}
