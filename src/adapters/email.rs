use crate::adapters::http::{error_excerpt, trim_base_url};
use crate::config::EmailApiSettings;
use crate::domain::ports::EmailChannel;
use crate::utils::error::{FareWatchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
}

/// 透過 HTTP 郵件 API（Postmark 格式）逐一寄送
pub struct HttpEmailClient {
    client: Client,
    api_url: String,
    api_token: SecretString,
    sender: String,
}

impl HttpEmailClient {
    pub fn new(client: Client, settings: EmailApiSettings) -> Self {
        Self {
            client,
            api_url: trim_base_url(&settings.api_url),
            api_token: settings.api_token,
            sender: settings.sender,
        }
    }

    fn failure(recipient: &str, message: String) -> FareWatchError {
        FareWatchError::NotificationError {
            channel: format!("email:{}", recipient),
            message,
        }
    }
}

#[async_trait]
impl EmailChannel for HttpEmailClient {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let request = SendEmailRequest {
            from: &self.sender,
            to: recipient,
            subject,
            text_body: body,
        };

        let response = self
            .client
            .post(format!("{}/email", self.api_url))
            .header("X-Postmark-Server-Token", self.api_token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::failure(recipient, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::failure(recipient, error_excerpt(response).await));
        }

        tracing::debug!("📧 Email accepted for {}", recipient);
        Ok(())
    }
}
