use crate::config::Settings;
use crate::core::pipeline::{parsed_destinations, DealPipeline, SearchPlan};
use crate::domain::model::{Destination, RunSummary};
use crate::domain::ports::DestinationStore;
use crate::utils::error::{FareWatchError, Result};
use crate::utils::validation::validate_iata_code;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// 命令列選擇的執行模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Fetch,
    /// 新增一列到試算表，`row_key` 覆寫包裝鍵
    Push {
        row: Map<String, Value>,
        row_key: Option<String>,
    },
    SyncIata,
    Search { notify: bool },
}

impl RunMode {
    /// 是否需要航班搜尋供應商
    pub fn needs_provider(&self) -> bool {
        matches!(self, Self::SyncIata | Self::Search { .. })
    }
}

/// 命令列對出發地與日期的覆寫
#[derive(Debug, Clone, Default)]
pub struct SearchOverrides {
    pub origin: Option<String>,
    pub departure: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

impl SearchPlan {
    /// 命令列 > 設定檔 / 環境變數 > 預設值
    pub fn from_settings(
        settings: &Settings,
        overrides: &SearchOverrides,
        today: NaiveDate,
    ) -> Result<Self> {
        let origin_code = overrides
            .origin
            .clone()
            .unwrap_or_else(|| settings.origin_iata.clone());
        validate_iata_code("--origin", &origin_code)?;

        let (departure_date, return_date) =
            settings.trip_window(overrides.departure, overrides.return_date, today)?;

        Ok(Self {
            origin_code,
            departure_date,
            return_date,
            currency: settings.currency.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ModeReport {
    Destinations(Vec<Destination>),
    Row(Value),
    Summary(RunSummary),
}

/// 依模式分派；`--fetch` 與 `--push` 只需要試算表，其餘模式需要航班搜尋管線
pub struct FareWatchEngine {
    store: Arc<dyn DestinationStore>,
    pipeline: Option<DealPipeline>,
}

impl FareWatchEngine {
    pub fn new(store: Arc<dyn DestinationStore>) -> Self {
        Self {
            store,
            pipeline: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: DealPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    fn pipeline(&self) -> Result<&DealPipeline> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| FareWatchError::MissingConfigError {
                field: "AMADEUS_API_KEY".to_string(),
            })
    }

    pub async fn run(&self, mode: &RunMode) -> Result<ModeReport> {
        match mode {
            RunMode::Fetch => {
                tracing::info!("📋 Fetching destinations...");
                let destinations = parsed_destinations(self.store.list_destinations().await?);
                tracing::info!("📋 Fetched {} destinations", destinations.len());
                Ok(ModeReport::Destinations(destinations))
            }
            RunMode::Push { row, row_key } => {
                tracing::info!("📤 Adding a row to the sheet...");
                let created = self.store.add_row(row, row_key.as_deref()).await?;
                Ok(ModeReport::Row(created))
            }
            RunMode::SyncIata => {
                tracing::info!("🗺️ Syncing IATA codes...");
                let summary = self.pipeline()?.sync_iata_codes().await?;
                Ok(ModeReport::Summary(summary))
            }
            RunMode::Search { notify } => {
                let pipeline = self.pipeline()?;
                let plan = pipeline.plan();
                tracing::info!(
                    "🔍 Searching fares from {} ({} -> {}){}",
                    plan.origin_code,
                    plan.departure_date,
                    plan.return_date,
                    if *notify { " with notifications" } else { "" }
                );
                let summary = pipeline.run_search(*notify).await?;
                Ok(ModeReport::Summary(summary))
            }
        }
    }

    /// 依序執行；任何致命錯誤都會中止後續模式
    pub async fn run_all(&self, modes: &[RunMode]) -> Result<Vec<(RunMode, ModeReport)>> {
        let mut reports = Vec::with_capacity(modes.len());
        for mode in modes {
            let report = self.run(mode).await?;
            reports.push((mode.clone(), report));
        }
        Ok(reports)
    }
}
