// Adapters layer: HTTP and SMTP implementations of the domain ports.

pub mod amadeus;
pub mod email;
pub mod http;
pub mod sheety;
pub mod smtp;
pub mod twilio;

pub use amadeus::AmadeusClient;
pub use email::HttpEmailClient;
pub use sheety::{SheetAuth, SheetClient};
pub use smtp::SmtpEmailClient;
pub use twilio::TwilioSms;
