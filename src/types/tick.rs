use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade delivered by the live stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Bare symbol with the quote currency stripped (e.g. `BTC`).
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}
