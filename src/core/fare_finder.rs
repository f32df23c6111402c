use crate::core::token_cache::AuthTokenCache;
use crate::domain::model::{FareQuote, OfferQuery};
use crate::domain::ports::FlightProvider;
use crate::utils::error::{FareWatchError, Result};
use chrono::NaiveDate;
use std::sync::Arc;

const DEFAULT_ADULTS: u32 = 1;
const DEFAULT_MAX_RESULTS: u32 = 10;

pub struct FareFinder {
    provider: Arc<dyn FlightProvider>,
    tokens: Arc<AuthTokenCache>,
    currency: String,
    max_results: u32,
}

impl FareFinder {
    pub fn new(
        provider: Arc<dyn FlightProvider>,
        tokens: Arc<AuthTokenCache>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tokens,
            currency: currency.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// 來回航班中最便宜的報價；供應商沒有任何報價時回傳 `None`
    pub async fn cheapest_fare(
        &self,
        origin_code: &str,
        destination_code: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Result<Option<FareQuote>> {
        let query = OfferQuery {
            origin_code: origin_code.to_string(),
            destination_code: destination_code.to_string(),
            departure_date,
            return_date,
            adults: DEFAULT_ADULTS,
            currency: self.currency.clone(),
            max_results: self.max_results,
        };

        let offers = self.search_with_retry(&query).await?;
        tracing::debug!(
            "Provider returned {} offers for {} -> {}",
            offers.len(),
            origin_code,
            destination_code
        );
        Ok(select_cheapest(offers))
    }

    /// token 被拒絕時強制刷新並重試一次
    async fn search_with_retry(&self, query: &OfferQuery) -> Result<Vec<FareQuote>> {
        let token = self.tokens.get_token().await?;
        match self.provider.search_offers(&token, query).await {
            Err(FareWatchError::TokenRejected { message }) => {
                tracing::debug!("Offer search rejected the token ({}), retrying once", message);
                let token = self.tokens.refresh(&token).await?;
                self.provider
                    .search_offers(&token, query)
                    .await
                    .map_err(|e| match e {
                        FareWatchError::TokenRejected { message } => {
                            FareWatchError::FareLookupError {
                                destination: query.destination_code.clone(),
                                message: format!("token rejected after refresh: {}", message),
                            }
                        }
                        other => other,
                    })
            }
            other => other,
        }
    }
}

/// 價格最低者；同價時保留先出現的
pub fn select_cheapest(offers: Vec<FareQuote>) -> Option<FareQuote> {
    offers.into_iter().fold(None, |best, offer| match best {
        Some(current) if current.price <= offer.price => Some(current),
        _ => Some(offer),
    })
}
