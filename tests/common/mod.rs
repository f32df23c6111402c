#![allow(dead_code)]

use chrono::NaiveDate;
use fare_watch::adapters::http::build_client;
use fare_watch::adapters::{AmadeusClient, HttpEmailClient, SheetClient, TwilioSms};
use fare_watch::config::{EmailApiSettings, TwilioSettings};
use fare_watch::SearchPlan;
use httpmock::MockServer;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::time::Duration;

pub const TWILIO_SID: &str = "AC0123456789";
pub const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC0123456789/Messages.json";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn client() -> Client {
    build_client(Duration::from_secs(5)).unwrap()
}

pub fn plan() -> SearchPlan {
    SearchPlan {
        origin_code: "CDG".to_string(),
        departure_date: date(2026, 5, 1),
        return_date: date(2026, 5, 8),
        currency: "EUR".to_string(),
    }
}

pub fn sheet(server: &MockServer) -> SheetClient {
    SheetClient::new(client(), server.url("/prices")).with_users_endpoint(server.url("/users"))
}

pub fn amadeus(server: &MockServer) -> AmadeusClient {
    AmadeusClient::new(
        client(),
        &server.base_url(),
        "test-key",
        SecretString::from("test-secret".to_string()),
    )
}

pub fn twilio(server: &MockServer) -> TwilioSms {
    TwilioSms::new(
        client(),
        TwilioSettings {
            base_url: server.base_url(),
            account_sid: TWILIO_SID.to_string(),
            auth_token: SecretString::from("twilio-token".to_string()),
            from_number: "+15550001111".to_string(),
            to_number: "+33600000000".to_string(),
        },
    )
}

pub fn email(server: &MockServer) -> HttpEmailClient {
    HttpEmailClient::new(
        client(),
        EmailApiSettings {
            api_url: server.base_url(),
            api_token: SecretString::from("postmark-token".to_string()),
            sender: "alerts@fare-watch.test".to_string(),
        },
    )
}

pub fn token_body() -> Value {
    json!({
        "type": "amadeusOAuth2Token",
        "access_token": "test-access-token",
        "token_type": "Bearer",
        "expires_in": 1799,
        "state": "approved"
    })
}

/// 來回航班報價；`via` 不為空時去程經停一次
pub fn offer(price: &str, destination: &str, via: Option<&str>) -> Value {
    let outbound = match via {
        Some(via) => json!([
            {"departure": {"iataCode": "CDG", "at": "2026-05-01T10:05:00"},
             "arrival": {"iataCode": via, "at": "2026-05-01T14:10:00"}},
            {"departure": {"iataCode": via, "at": "2026-05-01T17:20:00"},
             "arrival": {"iataCode": destination, "at": "2026-05-02T09:00:00"}}
        ]),
        None => json!([
            {"departure": {"iataCode": "CDG", "at": "2026-05-01T10:05:00"},
             "arrival": {"iataCode": destination, "at": "2026-05-01T21:40:00"}}
        ]),
    };
    json!({
        "type": "flight-offer",
        "price": {"currency": "EUR", "total": price, "grandTotal": price},
        "itineraries": [
            {"segments": outbound},
            {"segments": [
                {"departure": {"iataCode": destination, "at": "2026-05-08T11:00:00"},
                 "arrival": {"iataCode": "CDG", "at": "2026-05-08T18:30:00"}}
            ]}
        ]
    })
}
