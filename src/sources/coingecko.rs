use crate::error::{FeedError, Result};
use crate::sources::{check_status, http_client, QuoteProvider, QUOTE_TIMEOUT};
use crate::types::price::decimal_from_f64;
use crate::types::{PriceQuote, PriceSource};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const COINGECKO_PRO_API_URL: &str = "https://pro-api.coingecko.com/api/v3";

/// Cooldown applied after a 429 without a usable Retry-After header.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Symbol to CoinGecko ID mapping.
pub const SYMBOL_TO_ID: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("usdt", "tether"),
    ("usdc", "usd-coin"),
    ("bnb", "binancecoin"),
    ("sol", "solana"),
    ("xrp", "ripple"),
    ("doge", "dogecoin"),
    ("ada", "cardano"),
    ("avax", "avalanche-2"),
    ("dot", "polkadot"),
    ("link", "chainlink"),
    ("matic", "matic-network"),
    ("shib", "shiba-inu"),
    ("ltc", "litecoin"),
    ("trx", "tron"),
    ("atom", "cosmos"),
    ("uni", "uniswap"),
    ("xlm", "stellar"),
    ("bch", "bitcoin-cash"),
    ("near", "near"),
    ("apt", "aptos"),
];

pub fn default_base_url(keyed: bool) -> &'static str {
    if keyed {
        COINGECKO_PRO_API_URL
    } else {
        COINGECKO_API_URL
    }
}

/// CoinGecko id for a ticker symbol; unknown symbols fall back to the lowercase ticker.
pub fn coin_id(symbol: &str) -> String {
    let lower = symbol.trim().to_lowercase();
    SYMBOL_TO_ID
        .iter()
        .find(|(s, _)| *s == lower)
        .map(|(_, id)| id.to_string())
        .unwrap_or(lower)
}

#[derive(Debug, Deserialize)]
struct CoinGeckoPrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

impl CoinGeckoPrice {
    /// CoinGecko reports only the 24h percentage; the absolute change is
    /// derived from it: `change = price * pct / (100 + pct)`.
    fn into_price_quote(self, symbol: &str) -> Result<PriceQuote> {
        let provider = PriceSource::CoinGecko;
        let no_quote = || FeedError::NoQuote {
            provider,
            symbol: symbol.to_string(),
        };

        let price = self.usd.and_then(decimal_from_f64).ok_or_else(no_quote)?;
        let quote = PriceQuote::new(price, provider).ok_or_else(no_quote)?;

        let pct = self.usd_24h_change.and_then(decimal_from_f64);
        let change = pct.and_then(|pct| {
            let denominator = Decimal::ONE_HUNDRED.checked_add(pct)?;
            price
                .checked_mul(pct)?
                .checked_div(denominator)
                .map(|c| c.round_dp(8))
        });
        Ok(quote.with_change(change, pct.map(|p| p.round_dp(4))))
    }
}

/// CoinGecko REST client.
///
/// The public tier is aggressively rate limited, so after a 429 the client
/// refuses further calls until the cooldown elapses instead of hammering it.
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cooldown_until: Mutex<Option<Instant>>,
}

impl CoinGeckoClient {
    /// Create a new CoinGecko client.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: http_client(QUOTE_TIMEOUT),
            base_url: base_url.into(),
            api_key,
            cooldown_until: Mutex::new(None),
        }
    }

    /// Remaining cooldown after a 429, if any.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let guard = self.cooldown_until.lock().ok()?;
        let until = (*guard)?;
        let now = Instant::now();
        (until > now).then(|| until - now)
    }

    fn start_cooldown(&self, retry_after: Option<Duration>) -> Duration {
        let wait = retry_after.unwrap_or(DEFAULT_COOLDOWN);
        warn!("CoinGecko rate limited, cooling down for {:?}", wait);
        if let Ok(mut guard) = self.cooldown_until.lock() {
            *guard = Some(Instant::now() + wait);
        }
        wait
    }
}

#[async_trait]
impl QuoteProvider for CoinGeckoClient {
    fn source(&self) -> PriceSource {
        PriceSource::CoinGecko
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
        let provider = PriceSource::CoinGecko;
        if let Some(remaining) = self.cooldown_remaining() {
            debug!("CoinGecko cooling down for another {:?}", remaining);
            return Err(FeedError::CoolingDown {
                provider,
                remaining,
            });
        }

        let id = coin_id(symbol);
        let url = format!("{}/simple/price", self.base_url);

        let mut request = self.client.get(&url).query(&[
            ("ids", id.as_str()),
            ("vs_currencies", "usd"),
            ("include_24hr_change", "true"),
        ]);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("x_cg_pro_api_key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let remaining = self.start_cooldown(retry_after);
            return Err(FeedError::CoolingDown {
                provider,
                remaining,
            });
        }
        let response = check_status(provider, symbol, response).await?;

        let mut prices: HashMap<String, CoinGeckoPrice> = response
            .json()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;

        // Unknown ids come back as an empty object.
        let price = prices.remove(&id).ok_or_else(|| FeedError::NoQuote {
            provider,
            symbol: symbol.to_string(),
        })?;
        price.into_price_quote(symbol)
    }
}
