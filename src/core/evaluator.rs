use crate::domain::model::{Deal, Destination, FareQuote};

/// 報價嚴格低於目標價才算優惠；同價不算
pub fn evaluate(destination: &Destination, fare_quote: FareQuote) -> Option<Deal> {
    Deal::new(destination.clone(), fare_quote)
}
