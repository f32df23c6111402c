use crate::core::engine::{RunMode, SearchOverrides};
use crate::utils::validation::parse_iso_date;
use chrono::NaiveDate;
use clap::Parser;
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "fare-watch")]
#[command(about = "Watch flight prices for the destinations in your sheet and alert on deals")]
pub struct CliArgs {
    /// Print the destination rows from the sheet
    #[arg(long)]
    pub fetch: bool,

    /// Add one row to the sheet, given as a JSON object
    #[arg(long, value_name = "JSON", value_parser = parse_row_json)]
    pub push: Option<Map<String, Value>>,

    /// Wrapper key for --push (defaults to the singular of SHEETY_DATA_KEY)
    #[arg(long, requires = "push")]
    pub row_key: Option<String>,

    /// Fill missing IATA codes via the fare provider and write them back
    #[arg(long)]
    pub sync_iata: bool,

    /// Look up the cheapest fare for every destination
    #[arg(long)]
    pub search: bool,

    /// Send SMS / email alerts for deals found by --search
    #[arg(long, requires = "search")]
    pub notify: bool,

    /// IATA code of the departure airport (overrides ORIGIN_IATA)
    #[arg(long)]
    pub origin: Option<String>,

    /// Departure date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_cli_date)]
    pub departure: Option<NaiveDate>,

    /// Return date (YYYY-MM-DD)
    #[arg(long = "return", value_parser = parse_cli_date)]
    pub return_date: Option<NaiveDate>,

    /// Optional TOML settings file; its values override the environment
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path of the .env file to load
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON (for scheduled runs)")]
    pub json_logs: bool,
}

impl CliArgs {
    /// 固定順序：fetch → push → sync-iata → search
    pub fn modes(&self) -> Vec<RunMode> {
        let mut modes = Vec::new();
        if self.fetch {
            modes.push(RunMode::Fetch);
        }
        if let Some(row) = &self.push {
            modes.push(RunMode::Push {
                row: row.clone(),
                row_key: self.row_key.clone(),
            });
        }
        if self.sync_iata {
            modes.push(RunMode::SyncIata);
        }
        if self.search {
            modes.push(RunMode::Search {
                notify: self.notify,
            });
        }
        modes
    }

    pub fn overrides(&self) -> SearchOverrides {
        SearchOverrides {
            origin: self
                .origin
                .as_ref()
                .map(|origin| origin.trim().to_ascii_uppercase())
                .filter(|origin| !origin.is_empty()),
            departure: self.departure,
            return_date: self.return_date,
        }
    }
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    parse_iso_date("date", value).map_err(|e| e.to_string())
}

fn parse_row_json(value: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}
