use crate::core::evaluator::evaluate;
use crate::core::fare_finder::FareFinder;
use crate::core::notifier::Notifier;
use crate::core::resolver::{CodeResolver, ResolveOutcome};
use crate::core::token_cache::AuthTokenCache;
use crate::domain::model::{Destination, RunSummary};
use crate::domain::ports::{DestinationStore, FlightProvider};
use crate::utils::error::{FareWatchError, Result};
use crate::utils::validation::Validate;
use chrono::NaiveDate;
use std::sync::Arc;

/// 一次搜尋的固定參數：出發地、日期與幣別
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub origin_code: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub currency: String,
}

/// 留下可解析的列，其餘只記錄警告
pub fn parsed_destinations(rows: Vec<Result<Destination>>) -> Vec<Destination> {
    rows.into_iter()
        .filter_map(|row| match row {
            Ok(destination) => Some(destination),
            Err(e) => {
                tracing::warn!("⚠️ Skipping sheet row: {}", e);
                None
            }
        })
        .collect()
}

/// 每個目的地要走到哪一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ResolveOnly,
    Search { notify: bool },
}

/// 依試算表順序逐一處理目的地的驅動器
pub struct DealPipeline {
    store: Arc<dyn DestinationStore>,
    tokens: Arc<AuthTokenCache>,
    resolver: CodeResolver,
    finder: FareFinder,
    notifier: Option<Notifier>,
    plan: SearchPlan,
}

impl DealPipeline {
    pub fn new(
        store: Arc<dyn DestinationStore>,
        provider: Arc<dyn FlightProvider>,
        plan: SearchPlan,
    ) -> Self {
        let tokens = Arc::new(AuthTokenCache::new(provider.clone()));
        let resolver = CodeResolver::new(provider.clone(), tokens.clone(), store.clone());
        let finder = FareFinder::new(provider, tokens.clone(), plan.currency.clone());
        Self {
            store,
            tokens,
            resolver,
            finder,
            notifier: None,
            plan,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn plan(&self) -> &SearchPlan {
        &self.plan
    }

    /// 只補齊缺少的 IATA 代碼並寫回試算表
    pub async fn sync_iata_codes(&self) -> Result<RunSummary> {
        self.run(Stage::ResolveOnly).await
    }

    /// 完整流程：補代碼、查最低價、比對目標價，`notify` 時發送通知
    pub async fn run_search(&self, notify: bool) -> Result<RunSummary> {
        if notify && self.notifier.is_none() {
            return Err(FareWatchError::MissingConfigError {
                field: "TWILIO_SID".to_string(),
            });
        }
        self.run(Stage::Search { notify }).await
    }

    async fn run(&self, stage: Stage) -> Result<RunSummary> {
        // 先取得 token：憑證錯誤時不處理任何目的地
        self.tokens.get_token().await?;
        let rows = self.store.list_destinations().await?;
        tracing::info!("📋 Fetched {} destination rows", rows.len());

        let mut summary = RunSummary::default();
        for (index, row) in rows.into_iter().enumerate() {
            summary.destinations_processed += 1;
            let destination = match row {
                Ok(destination) => destination,
                Err(e) => {
                    let label = format!("row {}", index + 1);
                    tracing::warn!("⚠️ Skipping {}: {}", label, e);
                    summary.record_error(label, &e);
                    continue;
                }
            };
            let label = destination.label();

            if let Err(e) = self.process(destination, stage, &mut summary).await {
                if e.is_fatal() {
                    tracing::error!("❌ Aborting run at {}: {}", label, e);
                    return Err(e);
                }
                tracing::warn!("⚠️ Skipping {}: {}", label, e);
                summary.record_error(label, &e);
            }
        }

        tracing::info!(
            "✅ Run finished: {} processed, {} deals, {} errors",
            summary.destinations_processed,
            summary.deals_found,
            summary.error_count()
        );
        Ok(summary)
    }

    async fn process(
        &self,
        destination: Destination,
        stage: Stage,
        summary: &mut RunSummary,
    ) -> Result<()> {
        destination.validate()?;

        let resolution = self.resolver.resolve(destination).await?;
        if resolution.was_resolved() {
            summary.codes_resolved += 1;
        }
        if let ResolveOutcome::NotPersisted(e) = &resolution.outcome {
            summary.record_error(resolution.destination.label(), e);
        }

        let Stage::Search { notify } = stage else {
            return Ok(());
        };

        let destination = resolution.destination;
        let code = destination.iata_code.as_deref().ok_or_else(|| {
            FareWatchError::CodeResolutionError {
                city: destination.city_name.clone(),
                message: "destination has no IATA code".to_string(),
            }
        })?;

        let fare = self
            .finder
            .cheapest_fare(
                &self.plan.origin_code,
                code,
                self.plan.departure_date,
                self.plan.return_date,
            )
            .await?;

        let Some(fare) = fare else {
            tracing::info!("🔍 No offers for {}", destination.label());
            summary.no_deal += 1;
            return Ok(());
        };

        let price = fare.price;
        let Some(deal) = evaluate(&destination, fare) else {
            tracing::info!(
                "💤 {}: cheapest {} is not below target {}",
                destination.label(),
                price,
                destination.target_price
            );
            summary.no_deal += 1;
            return Ok(());
        };

        summary.deals_found += 1;
        tracing::info!(
            "🎉 Deal for {}: {} (target {})",
            destination.label(),
            price,
            destination.target_price
        );

        if notify {
            if let Some(notifier) = &self.notifier {
                let result = notifier.notify(&deal).await;
                if result.sms_sent() {
                    summary.sms_sent += 1;
                }
                summary.emails_sent += result.emails_sent;
                for e in result.errors() {
                    summary.record_error(destination.label(), e);
                }
            }
        }
        Ok(())
    }
}
