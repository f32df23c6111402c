use crate::domain::model::{Deal, FareQuote};
use crate::domain::ports::{EmailChannel, SmsChannel, SubscriberStore};
use crate::utils::error::FareWatchError;
use std::sync::Arc;

/// 訂閱者郵件通知：郵件通道加上訂閱者名單
pub struct EmailFanOut {
    pub channel: Arc<dyn EmailChannel>,
    pub subscribers: Arc<dyn SubscriberStore>,
}

/// 單一優惠的通知結果，失敗皆不中斷後續寄送
#[derive(Debug, Default)]
pub struct NotificationResult {
    pub sms_sid: Option<String>,
    pub sms_error: Option<FareWatchError>,
    pub emails_sent: usize,
    pub email_failures: Vec<(String, FareWatchError)>,
    pub subscriber_error: Option<FareWatchError>,
}

impl NotificationResult {
    pub fn sms_sent(&self) -> bool {
        self.sms_sid.is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &FareWatchError> {
        self.sms_error
            .iter()
            .chain(self.subscriber_error.iter())
            .chain(self.email_failures.iter().map(|(_, e)| e))
    }
}

pub struct Notifier {
    sms: Arc<dyn SmsChannel>,
    email: Option<EmailFanOut>,
}

impl Notifier {
    pub fn new(sms: Arc<dyn SmsChannel>) -> Self {
        Self { sms, email: None }
    }

    pub fn with_email(
        mut self,
        channel: Arc<dyn EmailChannel>,
        subscribers: Arc<dyn SubscriberStore>,
    ) -> Self {
        self.email = Some(EmailFanOut {
            channel,
            subscribers,
        });
        self
    }

    /// 每個優惠只發一則 SMS，然後對當下每位訂閱者各寄一封信
    pub async fn notify(&self, deal: &Deal) -> NotificationResult {
        let body = format_message(deal);
        let mut result = NotificationResult::default();

        match self.sms.send_sms(&body).await {
            Ok(sid) => {
                tracing::info!("📱 SMS sent for {} (sid {})", deal.destination().label(), sid);
                result.sms_sid = Some(sid);
            }
            Err(e) => {
                tracing::warn!("⚠️ SMS failed for {}: {}", deal.destination().label(), e);
                result.sms_error = Some(e);
            }
        }

        let Some(email) = &self.email else {
            return result;
        };

        let subscribers = match email.subscribers.list_subscribers().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                tracing::warn!("⚠️ Could not fetch subscribers: {}", e);
                result.subscriber_error = Some(e);
                return result;
            }
        };

        let subject = format_subject(deal);
        for subscriber in &subscribers {
            match email
                .channel
                .send_email(&subscriber.email_address, &subject, &body)
                .await
            {
                Ok(()) => result.emails_sent += 1,
                Err(e) => {
                    tracing::warn!("⚠️ Email to {} failed: {}", subscriber.email_address, e);
                    result
                        .email_failures
                        .push((subscriber.email_address.clone(), e));
                }
            }
        }
        tracing::info!(
            "📧 Emailed {}/{} subscribers for {}",
            result.emails_sent,
            subscribers.len(),
            deal.destination().label()
        );

        result
    }
}

pub fn format_subject(deal: &Deal) -> String {
    format!(
        "Low price alert: {} -> {}",
        deal.fare_quote().origin_code,
        deal.destination().city_name
    )
}

pub fn format_message(deal: &Deal) -> String {
    let quote = deal.fare_quote();
    let destination = deal.destination();
    format!(
        "Low price alert! Only {} {} to fly from {} to {} ({}), from {} to {}. Target price was {} {}. {}",
        quote.price.normalize(),
        quote.currency,
        quote.origin_code,
        destination.city_name,
        quote.destination_code,
        quote.departure_date,
        quote.return_date,
        destination.target_price.normalize(),
        quote.currency,
        describe_stops(quote)
    )
}

fn describe_stops(quote: &FareQuote) -> String {
    let stops = match quote.stop_count {
        0 => return "Direct flight.".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    };
    match &quote.via_code {
        Some(via) => format!("{} via {}.", stops, via),
        None => format!("{}.", stops),
    }
}
