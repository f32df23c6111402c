use crate::adapters::http::{error_excerpt, trim_base_url};
use crate::config::AmadeusSettings;
use crate::domain::model::{AuthToken, FareQuote, LocationCandidate, OfferQuery};
use crate::domain::ports::FlightProvider;
use crate::utils::error::{FareWatchError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const LOCATIONS_PATH: &str = "/v1/reference-data/locations";
const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    data: Option<Vec<LocationEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationEntry {
    iata_code: Option<String>,
    sub_type: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    data: Option<Vec<OfferEntry>>,
}

#[derive(Debug, Deserialize)]
struct OfferEntry {
    price: Option<OfferPrice>,
    #[serde(default)]
    itineraries: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
struct OfferPrice {
    total: Option<Value>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    departure: SegmentPoint,
    arrival: SegmentPoint,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentPoint {
    iata_code: String,
    at: String,
}

/// Amadeus Self-Service API 客戶端
pub struct AmadeusClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: SecretString,
    default_currency: String,
}

impl AmadeusClient {
    pub fn new(
        client: Client,
        base_url: &str,
        api_key: impl Into<String>,
        api_secret: SecretString,
    ) -> Self {
        Self {
            client,
            base_url: trim_base_url(base_url),
            api_key: api_key.into(),
            api_secret,
            default_currency: crate::config::DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn from_settings(client: Client, settings: AmadeusSettings) -> Self {
        let mut amadeus = Self::new(
            client,
            &settings.base_url,
            settings.api_key,
            settings.api_secret,
        );
        amadeus.default_currency = settings.currency;
        amadeus
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl FlightProvider for AmadeusClient {
    async fn request_token(&self) -> Result<AuthToken> {
        tracing::debug!("🔐 Requesting access token from {}", self.url(TOKEN_PATH));

        let response = self
            .client
            .post(self.url(TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| FareWatchError::AuthError {
                message: format!("token request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(FareWatchError::AuthError {
                message: format!("credentials rejected ({})", error_excerpt(response).await),
            });
        }

        let payload: TokenResponse =
            response.json().await.map_err(|e| FareWatchError::AuthError {
                message: format!("malformed token response: {}", e),
            })?;

        let access_token = payload
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| FareWatchError::AuthError {
                message: "token response has no access_token".to_string(),
            })?;

        let token = AuthToken::from_expires_in(
            access_token,
            payload.expires_in.unwrap_or(0),
            Utc::now(),
        );
        tracing::debug!("🔐 Access token valid until {}", token.expires_at());
        Ok(token)
    }

    async fn search_locations(
        &self,
        token: &AuthToken,
        keyword: &str,
    ) -> Result<Vec<LocationCandidate>> {
        let keyword = keyword.trim().to_uppercase();
        let resolution_error = |message: String| FareWatchError::CodeResolutionError {
            city: keyword.clone(),
            message,
        };

        let response = self
            .client
            .get(self.url(LOCATIONS_PATH))
            .header("Authorization", token.bearer())
            .query(&[("keyword", keyword.as_str()), ("subType", "CITY")])
            .send()
            .await
            .map_err(|e| resolution_error(format!("location search failed: {}", e)))?;

        let response = check_bearer_response(response)
            .await
            .map_err(|failure| failure.into_error(&resolution_error))?;

        let payload: LocationsResponse = response
            .json()
            .await
            .map_err(|e| resolution_error(format!("malformed location response: {}", e)))?;

        let entries = payload
            .data
            .ok_or_else(|| resolution_error("location response has no 'data' list".to_string()))?;

        // 沒有代碼的項目（例如景點）無法使用，直接略過
        let candidates: Vec<LocationCandidate> = entries
            .into_iter()
            .filter_map(|entry| {
                let iata_code = entry.iata_code.filter(|code| !code.trim().is_empty())?;
                Some(LocationCandidate {
                    iata_code: iata_code.trim().to_ascii_uppercase(),
                    subtype: entry.sub_type.unwrap_or_default(),
                    name: entry.name,
                })
            })
            .collect();
        Ok(candidates)
    }

    async fn search_offers(&self, token: &AuthToken, query: &OfferQuery) -> Result<Vec<FareQuote>> {
        let lookup_error = |message: String| FareWatchError::FareLookupError {
            destination: query.destination_code.clone(),
            message,
        };

        let departure = query.departure_date.format("%Y-%m-%d").to_string();
        let return_date = query.return_date.format("%Y-%m-%d").to_string();
        let adults = query.adults.to_string();
        let max = query.max_results.to_string();
        let currency = if query.currency.is_empty() {
            self.default_currency.as_str()
        } else {
            query.currency.as_str()
        };

        tracing::debug!(
            "✈️ Searching offers {} → {} ({} / {})",
            query.origin_code,
            query.destination_code,
            departure,
            return_date
        );

        let response = self
            .client
            .get(self.url(FLIGHT_OFFERS_PATH))
            .header("Authorization", token.bearer())
            .query(&[
                ("originLocationCode", query.origin_code.as_str()),
                ("destinationLocationCode", query.destination_code.as_str()),
                ("departureDate", departure.as_str()),
                ("returnDate", return_date.as_str()),
                ("adults", adults.as_str()),
                ("currencyCode", currency),
                ("max", max.as_str()),
            ])
            .send()
            .await
            .map_err(|e| lookup_error(format!("flight offer search failed: {}", e)))?;

        let response = check_bearer_response(response)
            .await
            .map_err(|failure| failure.into_error(&lookup_error))?;

        let payload: OffersResponse = response
            .json()
            .await
            .map_err(|e| lookup_error(format!("malformed offers response: {}", e)))?;

        let offers = payload
            .data
            .ok_or_else(|| lookup_error("offers response has no 'data' list".to_string()))?;

        offers
            .into_iter()
            .enumerate()
            .map(|(index, offer)| {
                offer_to_quote(offer, currency)
                    .map_err(|reason| lookup_error(format!("offer {}: {}", index, reason)))
            })
            .collect()
    }
}

/// 帶 bearer token 的請求回傳非 2xx
struct BearerFailure {
    status: StatusCode,
    message: String,
}

impl BearerFailure {
    /// 401 代表 token 被拒絕，其餘交由呼叫端決定錯誤類型
    fn into_error<F>(self, otherwise: F) -> FareWatchError
    where
        F: Fn(String) -> FareWatchError,
    {
        if self.status == StatusCode::UNAUTHORIZED {
            FareWatchError::TokenRejected {
                message: self.message,
            }
        } else {
            otherwise(self.message)
        }
    }
}

async fn check_bearer_response(response: Response) -> std::result::Result<Response, BearerFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(BearerFailure {
        status,
        message: error_excerpt(response).await,
    })
}

fn date_part(timestamp: &str) -> std::result::Result<NaiveDate, String> {
    let date = timestamp.split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid timestamp '{}': {}", timestamp, e))
}

fn offer_to_quote(
    offer: OfferEntry,
    fallback_currency: &str,
) -> std::result::Result<FareQuote, String> {
    let price = offer.price.ok_or("missing price")?;
    let price_value = match price.total {
        Some(Value::String(s)) => Decimal::from_str(s.trim()).map_err(|e| e.to_string())?,
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).map_err(|e| e.to_string())?,
        _ => return Err("missing price.total".to_string()),
    };

    let outbound = offer.itineraries.first().ok_or("no itineraries")?;
    let inbound = offer.itineraries.last().ok_or("no itineraries")?;
    let outbound_first = outbound.segments.first().ok_or("outbound leg has no segments")?;
    let outbound_last = outbound.segments.last().ok_or("outbound leg has no segments")?;
    let inbound_last = inbound.segments.last().unwrap_or(outbound_last);

    let stop_count = u32::try_from(outbound.segments.len().saturating_sub(1))
        .map_err(|e| e.to_string())?;
    let via_code = if stop_count > 0 {
        Some(outbound_first.arrival.iata_code.clone())
    } else {
        None
    };

    Ok(FareQuote {
        price: price_value,
        currency: price
            .currency
            .unwrap_or_else(|| fallback_currency.to_string()),
        origin_code: outbound_first.departure.iata_code.clone(),
        destination_code: outbound_last.arrival.iata_code.clone(),
        departure_date: date_part(&outbound_first.departure.at)?,
        return_date: date_part(&inbound_last.arrival.at)?,
        stop_count,
        via_code,
    })
}
