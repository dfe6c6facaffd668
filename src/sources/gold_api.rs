//! GoldAPI client: keyed spot prices for precious metals.

use crate::error::{FeedError, Result};
use crate::sources::{check_status, http_client, QuoteProvider};
use crate::types::price::decimal_from_f64;
use crate::types::{PriceQuote, PriceSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const GOLD_API_URL: &str = "https://www.goldapi.io/api";

const GOLD_API_TIMEOUT: Duration = Duration::from_secs(10);

/// GoldAPI spot response. Errors come back as `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct MetalPrice {
    price: Option<f64>,
    prev_close_price: Option<f64>,
    /// Absolute change
    ch: Option<f64>,
    /// Percent change
    chp: Option<f64>,
    error: Option<String>,
}

impl MetalPrice {
    fn into_price_quote(self, metal: &str) -> Result<PriceQuote> {
        let provider = PriceSource::GoldApi;
        let no_quote = || FeedError::NoQuote {
            provider,
            symbol: metal.to_string(),
        };

        if let Some(error) = self.error {
            debug!("GoldAPI error for {}: {}", metal, error);
            return Err(no_quote());
        }

        let price = self.price.and_then(decimal_from_f64).ok_or_else(no_quote)?;
        if self.ch.is_some() || self.chp.is_some() {
            let quote = PriceQuote::new(price, provider).ok_or_else(no_quote)?;
            return Ok(quote.with_change(
                self.ch.and_then(decimal_from_f64),
                self.chp.and_then(decimal_from_f64),
            ));
        }
        PriceQuote::from_previous_close(
            price,
            self.prev_close_price.and_then(decimal_from_f64),
            provider,
        )
        .ok_or_else(no_quote)
    }
}

/// GoldAPI client. Expects metal codes (`XAU`, `XAG`, `XPT`).
#[derive(Clone)]
pub struct GoldApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoldApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: http_client(GOLD_API_TIMEOUT),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl QuoteProvider for GoldApiClient {
    fn source(&self) -> PriceSource {
        PriceSource::GoldApi
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_quote(&self, metal: &str) -> Result<PriceQuote> {
        let provider = PriceSource::GoldApi;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FeedError::Unconfigured { provider })?;

        let metal = metal.trim().to_uppercase();
        let url = format!("{}/{}/USD", self.base_url, metal);
        debug!("Fetching GoldAPI spot price for {}", metal);

        let response = self
            .client
            .get(&url)
            .header("x-access-token", api_key)
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;
        let response = check_status(provider, &metal, response).await?;

        let data: MetalPrice = response
            .json()
            .await
            .map_err(|e| FeedError::from_reqwest(provider, e))?;

        data.into_price_quote(&metal)
    }
}
