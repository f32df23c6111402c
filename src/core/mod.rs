pub mod engine;
pub mod evaluator;
pub mod fare_finder;
pub mod notifier;
pub mod pipeline;
pub mod resolver;
pub mod token_cache;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{Deal, Destination, FareQuote, RunSummary};
pub use crate::utils::error::Result;
