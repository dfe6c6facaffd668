//! Binance REST client: 24h ticker quotes and klines.

use crate::error::{FeedError, Result};
use crate::sources::{check_status, http_client, QuoteProvider, QUOTE_TIMEOUT};
use crate::types::price::parse_decimal;
use crate::types::{Candle, PriceQuote, PriceSource};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Quote currency every symbol is paired against.
pub const QUOTE_ASSET: &str = "USDT";

/// Binance 24hr ticker response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker {
    symbol: String,
    last_price: String,
    price_change: Option<String>,
    price_change_percent: Option<String>,
}

impl BinanceTicker {
    fn into_price_quote(self) -> Result<PriceQuote> {
        let provider = PriceSource::Binance;
        let price = parse_decimal(&self.last_price)
            .ok_or_else(|| FeedError::malformed(provider, format!("lastPrice {:?}", self.last_price)))?;
        let quote = PriceQuote::new(price, provider).ok_or_else(|| FeedError::NoQuote {
            provider,
            symbol: self.symbol.clone(),
        })?;

        Ok(quote.with_change(
            self.price_change.as_deref().and_then(parse_decimal),
            self.price_change_percent.as_deref().and_then(parse_decimal),
        ))
    }
}

/// Trading pair for a bare symbol (`btc` -> `BTCUSDT`).
pub fn trading_pair(symbol: &str) -> String {
    format!("{}{}", symbol.trim().to_uppercase(), QUOTE_ASSET)
}

/// Parse one kline row: `[openTime, open, high, low, close, volume, ...]`.
fn parse_kline(row: &[Value]) -> Option<Candle> {
    let field = |i: usize| -> Option<Decimal> { row.get(i)?.as_str().and_then(parse_decimal) };
    Some(Candle {
        time: row.first()?.as_i64()?,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}

/// Binance REST client.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    /// Create a new Binance client with the quote timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, QUOTE_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.into(),
        }
    }

    /// Fetch historical klines for `symbol` against USDT. One attempt.
    pub async fn fetch_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let provider = PriceSource::Binance;
        let pair = trading_pair(symbol);
        let url = format!("{}/klines", self.base_url);
        let limit = limit.to_string();
        debug!("Fetching Binance klines {} {} x{}", pair, interval, limit);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", pair.as_str()),
                ("interval", interval),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;
        let response = check_status(provider, &pair, response).await?;

        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;

        rows.iter()
            .map(|row| {
                parse_kline(row).ok_or_else(|| FeedError::malformed(provider, "unexpected kline row"))
            })
            .collect()
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new(BINANCE_API_URL)
    }
}

#[async_trait]
impl QuoteProvider for BinanceClient {
    fn source(&self) -> PriceSource {
        PriceSource::Binance
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
        let provider = PriceSource::Binance;
        let pair = trading_pair(symbol);
        let url = format!("{}/ticker/24hr", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", pair.as_str())])
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;
        let response = check_status(provider, &pair, response).await?;

        let ticker: BinanceTicker = response
            .json()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;

        debug!("Binance price update: {} = {}", ticker.symbol, ticker.last_price);
        ticker.into_price_quote()
    }
}
