mod common;

use common::*;
use fare_watch::adapters::{SheetAuth, SheetClient};
use fare_watch::domain::model::{AuthToken, OfferQuery};
use fare_watch::domain::ports::{
    DestinationStore, EmailChannel, FlightProvider, SmsChannel, SubscriberStore,
};
use fare_watch::FareWatchError;
use httpmock::prelude::*;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;

fn bearer() -> AuthToken {
    AuthToken::from_expires_in("test-access-token", 1799, chrono::Utc::now())
}

fn query(destination: &str) -> OfferQuery {
    OfferQuery {
        origin_code: "CDG".to_string(),
        destination_code: destination.to_string(),
        departure_date: date(2026, 5, 1),
        return_date: date(2026, 5, 8),
        adults: 1,
        currency: "EUR".to_string(),
        max_results: 10,
    }
}

#[tokio::test]
async fn test_sheet_lists_destinations_in_store_order() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/prices")
            .header("authorization", "Bearer sheet-token");
        then.status(200).json_body(json!({
            "prices": [
                {"city": "Paris", "iataCode": "PAR", "lowestPrice": 54, "id": 2},
                {"city": "Tokyo", "iataCode": "", "lowestPrice": "485.50", "id": 3},
                {"city": "Hong Kong", "iataCode": "hkg", "lowestPrice": 551, "id": 4}
            ]
        }));
    });

    let sheet = SheetClient::new(client(), server.url("/prices"))
        .with_auth(SheetAuth::Bearer(SecretString::from("sheet-token".to_string())));
    let destinations: Vec<_> = sheet
        .list_destinations()
        .await
        .unwrap()
        .into_iter()
        .map(Result::unwrap)
        .collect();

    mock.assert();
    let cities: Vec<&str> = destinations.iter().map(|d| d.city_name.as_str()).collect();
    assert_eq!(cities, vec!["Paris", "Tokyo", "Hong Kong"]);
    assert_eq!(destinations[1].iata_code, None);
    assert_eq!(destinations[1].target_price, dec!(485.50));
    assert_eq!(destinations[2].iata_code.as_deref(), Some("HKG"));
}

#[tokio::test]
async fn test_sheet_row_without_id_is_returned_next_to_valid_rows() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/prices");
        then.status(200).json_body(json!({
            "prices": [
                {"id": 2, "city": "Rome", "iataCode": "ROM", "lowestPrice": 150},
                {"city": "Oslo", "iataCode": "OSL", "lowestPrice": 150}
            ]
        }));
    });

    let rows = sheet(&server).list_destinations().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].as_ref().unwrap().city_name, "Rome");
    match &rows[1] {
        Err(FareWatchError::InvalidDestinationError { id, .. }) => assert_eq!(id, "#2"),
        other => panic!("unexpected row: {:?}", other),
    }
}

#[tokio::test]
async fn test_sheet_push_wraps_row_in_singular_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/prices")
            .json_body(json!({"price": {"city": "Oslo", "lowestPrice": 180}}));
        then.status(200)
            .json_body(json!({"price": {"id": 9, "city": "Oslo", "lowestPrice": 180}}));
    });

    let row = json!({"city": "Oslo", "lowestPrice": 180});
    let created = sheet(&server)
        .add_row(row.as_object().unwrap(), None)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(created["price"]["id"], 9);
}

#[tokio::test]
async fn test_sheet_push_honours_row_key_override() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/prices")
            .json_body(json!({"deal": {"city": "Oslo"}}));
        then.status(200).json_body(json!({"deal": {"id": 10}}));
    });

    let row = json!({"city": "Oslo"});
    sheet(&server)
        .add_row(row.as_object().unwrap(), Some("deal"))
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_sheet_push_rejected_is_store_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/prices");
        then.status(400).body("Bad Request");
    });

    let row = json!({"city": "Oslo"});
    let err = sheet(&server)
        .add_row(row.as_object().unwrap(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FareWatchError::StoreError { .. }));
}

#[tokio::test]
async fn test_sheet_error_status_is_store_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/prices");
        then.status(402).body("Sheety quota exceeded");
    });

    let err = sheet(&server).list_destinations().await.unwrap_err();
    match err {
        FareWatchError::StoreError { message } => assert!(message.contains("402")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_sheet_update_uses_custom_data_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/flights/7")
            .header_exists("authorization")
            .json_body(json!({"flight": {"iataCode": "BER"}}));
        then.status(200).json_body(json!({"flight": {"id": 7, "iataCode": "BER"}}));
    });

    let sheet = SheetClient::new(client(), server.url("/flights"))
        .with_data_key("flights")
        .with_auth(SheetAuth::Basic {
            username: "sheet".to_string(),
            password: SecretString::from("s3cret".to_string()),
        });
    sheet.update_iata_code(7, "BER").await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_sheet_lists_subscribers_and_skips_blank_emails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/users");
        then.status(200).json_body(json!({
            "users": [
                {"id": 2, "email": "ada@example.com"},
                {"id": 3, "email": "  "},
                {"id": 4, "emailAddress": "grace@example.com"}
            ]
        }));
    });

    let subscribers = sheet(&server).list_subscribers().await.unwrap();
    let emails: Vec<&str> = subscribers.iter().map(|s| s.email_address.as_str()).collect();
    assert_eq!(emails, vec!["ada@example.com", "grace@example.com"]);
}

#[tokio::test]
async fn test_subscribers_without_users_endpoint_is_config_error() {
    let sheet = SheetClient::new(client(), "http://127.0.0.1:9/prices");
    let err = sheet.list_subscribers().await.unwrap_err();
    assert!(matches!(err, FareWatchError::MissingConfigError { .. }));
}

#[tokio::test]
async fn test_amadeus_token_exchange() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/security/oauth2/token")
            .header("content-type", "application/x-www-form-urlencoded")
            .body_contains("client_id=test-key")
            .body_contains("client_secret=test-secret");
        then.status(200).json_body(token_body());
    });

    let token = amadeus(&server).request_token().await.unwrap();

    mock.assert();
    assert_eq!(token.value(), "test-access-token");
    assert!(!token.is_expired(chrono::Utc::now()));
}

#[tokio::test]
async fn test_amadeus_token_without_access_token_is_auth_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/security/oauth2/token");
        then.status(200).json_body(json!({"expires_in": 1799}));
    });

    let err = amadeus(&server).request_token().await.unwrap_err();
    assert!(matches!(err, FareWatchError::AuthError { .. }));
}

#[tokio::test]
async fn test_amadeus_location_search_keeps_response_order() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/reference-data/locations")
            .query_param("keyword", "PARIS")
            .query_param("subType", "CITY");
        then.status(200).json_body(json!({
            "data": [
                {"subType": "CITY", "name": "PARIS", "iataCode": "PAR"},
                {"subType": "CITY", "name": "PARIS", "iataCode": "PRS"}
            ]
        }));
    });

    let candidates = amadeus(&server)
        .search_locations(&bearer(), "Paris")
        .await
        .unwrap();

    let codes: Vec<&str> = candidates.iter().map(|c| c.iata_code.as_str()).collect();
    assert_eq!(codes, vec!["PAR", "PRS"]);
}

#[tokio::test]
async fn test_amadeus_location_entries_without_code_are_skipped() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/reference-data/locations");
        then.status(200).json_body(json!({
            "data": [
                {"subType": "CITY", "name": "PARIS", "iataCode": "PAR"},
                {"subType": "POINT_OF_INTEREST", "name": "EIFFEL TOWER"}
            ]
        }));
    });

    let candidates = amadeus(&server)
        .search_locations(&bearer(), "Paris")
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].iata_code, "PAR");
}

#[tokio::test]
async fn test_amadeus_malformed_location_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/reference-data/locations");
        then.status(200).json_body(json!({"meta": {"count": 0}}));
    });

    let err = amadeus(&server)
        .search_locations(&bearer(), "Paris")
        .await
        .unwrap_err();
    assert!(matches!(err, FareWatchError::CodeResolutionError { .. }));
}

#[tokio::test]
async fn test_amadeus_401_on_bearer_call_is_token_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v2/shopping/flight-offers");
        then.status(401).json_body(json!({
            "errors": [{"code": 38192, "title": "Access token expired", "status": 401}]
        }));
    });

    let err = amadeus(&server)
        .search_offers(&bearer(), &query("NRT"))
        .await
        .unwrap_err();
    assert!(matches!(err, FareWatchError::TokenRejected { .. }));
}

#[tokio::test]
async fn test_amadeus_offers_convert_to_quotes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/shopping/flight-offers")
            .query_param("adults", "1")
            .query_param("currencyCode", "EUR")
            .query_param("max", "10");
        then.status(200).json_body(json!({
            "data": [offer("375.00", "NRT", Some("HEL")), offer("420.10", "NRT", None)]
        }));
    });

    let quotes = amadeus(&server)
        .search_offers(&bearer(), &query("NRT"))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].price, dec!(375));
    assert_eq!(quotes[0].stop_count, 1);
    assert_eq!(quotes[0].via_code.as_deref(), Some("HEL"));
    assert!(quotes[1].is_direct());
    assert_eq!(quotes[1].return_date, date(2026, 5, 8));
}

#[tokio::test]
async fn test_amadeus_empty_offer_list() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v2/shopping/flight-offers");
        then.status(200).json_body(json!({"meta": {"count": 0}, "data": []}));
    });

    let quotes = amadeus(&server)
        .search_offers(&bearer(), &query("NRT"))
        .await
        .unwrap();
    assert!(quotes.is_empty());
}

#[tokio::test]
async fn test_twilio_returns_message_sid() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(MESSAGES_PATH)
            .header_exists("authorization")
            .body_contains("To=%2B33600000000")
            .body_contains("From=%2B15550001111");
        then.status(201).json_body(json!({"sid": "SM0001", "status": "queued"}));
    });

    let sid = twilio(&server).send_sms("Low price alert!").await.unwrap();

    mock.assert();
    assert_eq!(sid, "SM0001");
}

#[tokio::test]
async fn test_twilio_error_is_notification_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(400).json_body(json!({"code": 21211, "message": "Invalid 'To' Phone Number"}));
    });

    let err = twilio(&server).send_sms("hello").await.unwrap_err();
    match err {
        FareWatchError::NotificationError { channel, message } => {
            assert_eq!(channel, "sms");
            assert!(message.contains("400"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_email_request_shape() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/email")
            .header("X-Postmark-Server-Token", "postmark-token")
            .json_body(json!({
                "From": "alerts@fare-watch.test",
                "To": "ada@example.com",
                "Subject": "Low price alert: CDG -> Tokyo",
                "TextBody": "body"
            }));
        then.status(200).json_body(json!({"ErrorCode": 0}));
    });

    email(&server)
        .send_email("ada@example.com", "Low price alert: CDG -> Tokyo", "body")
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_email_rejection_names_recipient() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/email");
        then.status(422).json_body(json!({"ErrorCode": 406, "Message": "Inactive recipient"}));
    });

    let err = email(&server)
        .send_email("gone@example.com", "subject", "body")
        .await
        .unwrap_err();
    match err {
        FareWatchError::NotificationError { channel, .. } => {
            assert_eq!(channel, "email:gone@example.com")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
