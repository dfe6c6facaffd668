//! Yahoo Finance chart API client.
//!
//! Primary source for stocks, ETFs, mutual funds, index proxies and
//! commodity futures. Keyless.

use crate::error::{FeedError, Result};
use crate::sources::{check_status, http_client, QuoteProvider, QUOTE_TIMEOUT};
use crate::types::price::decimal_from_f64;
use crate::types::{PriceQuote, PriceSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance";

/// Yahoo Finance chart response.
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

/// Normalize symbol for Yahoo Finance API.
/// Yahoo uses hyphens instead of dots for share classes (e.g., BRK-B not BRK.B)
fn normalize_yahoo_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace('.', "-")
}

/// Yahoo Finance API client.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a new Yahoo Finance client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(QUOTE_TIMEOUT),
            base_url: base_url.into(),
        }
    }

    fn parse_chart(symbol: &str, data: YahooChartResponse) -> Result<PriceQuote> {
        let provider = PriceSource::Yahoo;

        if let Some(error) = data.chart.error {
            debug!("Yahoo error for {}: {} - {}", symbol, error.code, error.description);
            return Err(FeedError::NoQuote {
                provider,
                symbol: symbol.to_string(),
            });
        }

        let meta = data
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(|r| r.meta)
            .ok_or_else(|| FeedError::malformed(provider, "no results in response"))?;

        let price = meta
            .regular_market_price
            .and_then(decimal_from_f64)
            .ok_or_else(|| FeedError::malformed(provider, "missing regularMarketPrice"))?;
        let previous_close = meta
            .previous_close
            .or(meta.chart_previous_close)
            .and_then(decimal_from_f64);

        PriceQuote::from_previous_close(price, previous_close, provider).ok_or_else(|| {
            FeedError::NoQuote {
                provider,
                symbol: symbol.to_string(),
            }
        })
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new(YAHOO_BASE_URL)
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    fn source(&self) -> PriceSource {
        PriceSource::Yahoo
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
        let yahoo_symbol = normalize_yahoo_symbol(symbol);
        let url = format!("{}/chart/{}", self.base_url, yahoo_symbol);
        debug!("Fetching Yahoo quote: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(PriceSource::Yahoo, e))?;
        let response = check_status(PriceSource::Yahoo, symbol, response).await?;

        let data: YahooChartResponse = response
            .json()
            .await
            .map_err(|e| FeedError::from_reqwest(PriceSource::Yahoo, e))?;

        Self::parse_chart(symbol, data)
    }
}
