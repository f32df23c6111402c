pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;
pub use config::Settings;

pub use core::engine::{FareWatchEngine, ModeReport, RunMode, SearchOverrides};
pub use core::pipeline::{DealPipeline, SearchPlan};
pub use domain::model::{Deal, Destination, FareQuote, RunSummary};
pub use utils::error::{FareWatchError, Result};
