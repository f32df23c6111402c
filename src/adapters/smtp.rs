use crate::config::SmtpSettings;
use crate::domain::ports::EmailChannel;
use crate::utils::error::{FareWatchError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

/// 以 STARTTLS 連上 SMTP 伺服器並登入，每位訂閱者各寄一封純文字信
pub struct SmtpEmailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpEmailClient {
    pub fn new(settings: SmtpSettings) -> Result<Self> {
        let sender: Mailbox =
            settings
                .sender
                .parse()
                .map_err(|e| FareWatchError::InvalidConfigValueError {
                    field: "EMAIL_SENDER".to_string(),
                    value: settings.sender.clone(),
                    reason: format!("Invalid email address: {}", e),
                })?;

        let credentials = Credentials::new(
            settings.sender.clone(),
            settings.password.expose_secret().to_owned(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| FareWatchError::ConfigError {
                message: format!("invalid SMTP host '{}': {}", settings.host, e),
            })?
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(settings.timeout))
            .build();

        tracing::debug!("📧 SMTP relay {}:{} as {}", settings.host, settings.port, sender);
        Ok(Self { transport, sender })
    }
}

fn failure(recipient: &str, message: String) -> FareWatchError {
    FareWatchError::NotificationError {
        channel: format!("email:{}", recipient),
        message,
    }
}

pub(crate) fn build_message(
    sender: &Mailbox,
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<Message> {
    let to: Mailbox = recipient
        .parse()
        .map_err(|e| failure(recipient, format!("invalid recipient address: {}", e)))?;

    Message::builder()
        .from(sender.clone())
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| failure(recipient, format!("could not build message: {}", e)))
}

#[async_trait]
impl EmailChannel for SmtpEmailClient {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let message = build_message(&self.sender, recipient, subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| failure(recipient, format!("SMTP delivery failed: {}", e)))?;

        tracing::debug!("📧 Email sent to {}", recipient);
        Ok(())
    }
}
