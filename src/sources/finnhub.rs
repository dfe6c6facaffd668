//! Finnhub API client for stock and ETF quotes.
//!
//! Secondary equity source. Requires an API key; without one every call
//! fails fast with `Unconfigured`.

use crate::error::{FeedError, Result};
use crate::sources::{check_status, http_client, QuoteProvider, QUOTE_TIMEOUT};
use crate::types::price::decimal_from_f64;
use crate::types::{PriceQuote, PriceSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const FINNHUB_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub quote response.
#[derive(Debug, Clone, Deserialize)]
pub struct FinnhubQuote {
    /// Current price
    #[serde(rename = "c")]
    pub current: f64,
    /// Change
    #[serde(rename = "d")]
    pub change: Option<f64>,
    /// Percent change
    #[serde(rename = "dp")]
    pub change_percent: Option<f64>,
    /// Previous close price
    #[serde(rename = "pc", default)]
    pub previous_close: Option<f64>,
    /// Timestamp
    #[serde(rename = "t", default)]
    pub timestamp: Option<i64>,
}

impl FinnhubQuote {
    /// Finnhub answers unknown symbols with an all-zero quote.
    fn into_price_quote(self, symbol: &str) -> Result<PriceQuote> {
        let provider = PriceSource::Finnhub;
        let no_quote = || FeedError::NoQuote {
            provider,
            symbol: symbol.to_string(),
        };

        let price = decimal_from_f64(self.current).ok_or_else(no_quote)?;
        let quote = PriceQuote::new(price, provider).ok_or_else(no_quote)?;

        if self.change.is_some() || self.change_percent.is_some() {
            return Ok(quote.with_change(
                self.change.and_then(decimal_from_f64),
                self.change_percent.and_then(decimal_from_f64),
            ));
        }
        PriceQuote::from_previous_close(
            price,
            self.previous_close.and_then(decimal_from_f64),
            provider,
        )
        .ok_or_else(no_quote)
    }
}

/// Finnhub API client.
#[derive(Clone)]
pub struct FinnhubClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FinnhubClient {
    /// Create a new Finnhub client.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: http_client(QUOTE_TIMEOUT),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    fn source(&self) -> PriceSource {
        PriceSource::Finnhub
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
        let api_key = self.api_key.as_deref().ok_or(FeedError::Unconfigured {
            provider: PriceSource::Finnhub,
        })?;

        let symbol = symbol.trim().to_uppercase();
        let url = format!("{}/quote", self.base_url);
        debug!("Fetching Finnhub quote for {}", symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str()), ("token", api_key)])
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(PriceSource::Finnhub, e))?;
        let response = check_status(PriceSource::Finnhub, &symbol, response).await?;

        let quote: FinnhubQuote = response
            .json()
            .await
            .map_err(|e| FeedError::from_reqwest(PriceSource::Finnhub, e))?;

        quote.into_price_quote(&symbol)
    }
}
