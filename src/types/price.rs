use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price source identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    // Equity, index proxy and futures
    Yahoo,
    Finnhub,
    // Crypto
    Binance,
    CoinGecko,
    // Precious metals
    GoldApi,
    /// Static last-known table, used after every live provider failed.
    Fallback,
    /// Served from the quote cache.
    Cache,
}

impl PriceSource {
    /// Whether this source is a live network provider.
    pub fn is_live(&self) -> bool {
        !matches!(self, PriceSource::Fallback | PriceSource::Cache)
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSource::Yahoo => write!(f, "yahoo"),
            PriceSource::Finnhub => write!(f, "finnhub"),
            PriceSource::Binance => write!(f, "binance"),
            PriceSource::CoinGecko => write!(f, "coingecko"),
            PriceSource::GoldApi => write!(f, "goldapi"),
            PriceSource::Fallback => write!(f, "fallback"),
            PriceSource::Cache => write!(f, "cache"),
        }
    }
}

/// Canonical price quote handed to every caller.
///
/// A quote always carries a strictly positive price. Providers that report
/// zero or negative prices produce no quote at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<Decimal>,
    pub source: PriceSource,
    pub observed_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Build a quote observed now. Returns `None` for non-positive prices.
    pub fn new(price: Decimal, source: PriceSource) -> Option<Self> {
        if price <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            price,
            change: None,
            change_percent: None,
            source,
            observed_at: Utc::now(),
        })
    }

    /// Build a quote from a provider that reports only absolute levels,
    /// deriving the change from the previous close.
    pub fn from_previous_close(
        price: Decimal,
        previous_close: Option<Decimal>,
        source: PriceSource,
    ) -> Option<Self> {
        let quote = Self::new(price, source)?;
        match previous_close.filter(|pc| *pc > Decimal::ZERO) {
            Some(pc) => {
                // Absurd provider values overflow; leave the change unknown.
                let change = price.checked_sub(pc);
                let pct = change
                    .and_then(|c| c.checked_div(pc))
                    .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                    .map(|p| p.round_dp(4));
                Some(quote.with_change(change, pct))
            }
            None => Some(quote),
        }
    }

    pub fn with_change(mut self, change: Option<Decimal>, change_percent: Option<Decimal>) -> Self {
        self.change = change;
        self.change_percent = change_percent;
        self
    }

    pub fn with_source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }
}

/// Parse a provider decimal string, ignoring surrounding whitespace.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// Convert a provider float to a decimal, rejecting NaN and infinities.
pub(crate) fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::from_f64(value)
    } else {
        None
    }
}
