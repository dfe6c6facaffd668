pub mod binance;
pub mod binance_ws;
pub mod coingecko;
pub mod finnhub;
pub mod gold_api;
pub mod yahoo;

pub use binance::BinanceClient;
pub use binance_ws::{StreamHandle, StreamState, TradeStream};
pub use coingecko::CoinGeckoClient;
pub use finnhub::FinnhubClient;
pub use gold_api::GoldApiClient;
pub use yahoo::YahooClient;

use crate::error::{FeedError, Result};
use crate::types::{PriceQuote, PriceSource};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::warn;

/// Timeout for a single quote request.
pub const QUOTE_TIMEOUT: Duration = Duration::from_secs(8);

/// One external price source.
///
/// An implementation performs exactly one network attempt per call; retry
/// and fallback are layered on top by the resolver.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn source(&self) -> PriceSource;

    /// Whether the provider has the credentials it needs. Unconfigured
    /// providers are skipped by the resolver.
    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote>;
}

/// Build an HTTP client with a per-request timeout.
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (compatible; pricewell/0.1)")
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Turn a non-success response into the matching error, logging the body.
pub(crate) async fn check_status(
    provider: PriceSource,
    symbol: &str,
    response: Response,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    warn!(
        "{} API returned {} for {}: {}",
        provider,
        status,
        symbol,
        text.chars().take(200).collect::<String>()
    );
    Err(FeedError::from_status(provider, symbol, status))
}
