use crate::core::token_cache::AuthTokenCache;
use crate::domain::model::{Destination, LocationCandidate};
use crate::domain::ports::{DestinationStore, FlightProvider};
use crate::utils::error::{FareWatchError, Result};
use std::sync::Arc;

const CITY_SUBTYPE: &str = "CITY";

/// 代碼回寫的結果
#[derive(Debug)]
pub enum ResolveOutcome {
    /// 目的地原本就有代碼，沒有查詢也沒有寫入
    Unchanged,
    Persisted,
    /// 已查到代碼但寫回試算表失敗；後續查價照常進行
    NotPersisted(FareWatchError),
}

#[derive(Debug)]
pub struct Resolution {
    pub destination: Destination,
    pub outcome: ResolveOutcome,
}

impl Resolution {
    pub fn was_resolved(&self) -> bool {
        !matches!(self.outcome, ResolveOutcome::Unchanged)
    }
}

pub struct CodeResolver {
    provider: Arc<dyn FlightProvider>,
    tokens: Arc<AuthTokenCache>,
    store: Arc<dyn DestinationStore>,
}

impl CodeResolver {
    pub fn new(
        provider: Arc<dyn FlightProvider>,
        tokens: Arc<AuthTokenCache>,
        store: Arc<dyn DestinationStore>,
    ) -> Self {
        Self {
            provider,
            tokens,
            store,
        }
    }

    pub async fn resolve(&self, destination: Destination) -> Result<Resolution> {
        if destination.is_resolved() {
            return Ok(Resolution {
                destination,
                outcome: ResolveOutcome::Unchanged,
            });
        }

        let token = self.tokens.get_token().await?;
        let candidates = match self
            .provider
            .search_locations(&token, &destination.city_name)
            .await
        {
            Err(FareWatchError::TokenRejected { .. }) => {
                let token = self.tokens.refresh(&token).await?;
                self.provider
                    .search_locations(&token, &destination.city_name)
                    .await
                    .map_err(|e| as_resolution_error(&destination.city_name, e))?
            }
            other => other?,
        };

        let code = pick_city_code(&candidates).ok_or_else(|| {
            FareWatchError::CodeResolutionError {
                city: destination.city_name.clone(),
                message: "no city matches".to_string(),
            }
        })?;
        tracing::info!("🗺️ Resolved {} -> {}", destination.city_name, code);

        let destination = destination.with_iata_code(code);
        let code = destination.iata_code.as_deref().unwrap_or_default();
        let outcome = match self.store.update_iata_code(destination.id, code).await {
            Ok(()) => ResolveOutcome::Persisted,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not write IATA code back for {}: {}",
                    destination.label(),
                    e
                );
                ResolveOutcome::NotPersisted(e)
            }
        };

        Ok(Resolution {
            destination,
            outcome,
        })
    }
}

/// 第一個 CITY 類型的候選，依供應商回傳順序
pub fn pick_city_code(candidates: &[LocationCandidate]) -> Option<String> {
    candidates
        .iter()
        .find(|c| c.subtype.eq_ignore_ascii_case(CITY_SUBTYPE) && !c.iata_code.trim().is_empty())
        .map(|c| c.iata_code.trim().to_ascii_uppercase())
}

fn as_resolution_error(city: &str, error: FareWatchError) -> FareWatchError {
    match error {
        FareWatchError::TokenRejected { message } => FareWatchError::CodeResolutionError {
            city: city.to_string(),
            message: format!("token rejected after refresh: {}", message),
        },
        other => other,
    }
}
