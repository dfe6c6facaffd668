use crate::sources::{binance, binance_ws, coingecko, finnhub, gold_api, yahoo};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Provider endpoint configuration.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub yahoo_base_url: String,
    pub finnhub_base_url: String,
    pub binance_base_url: String,
    pub coingecko_base_url: String,
    pub gold_api_base_url: String,
    pub binance_stream_url: String,
}

impl EndpointConfig {
    fn defaults(coingecko_keyed: bool) -> Self {
        Self {
            yahoo_base_url: yahoo::YAHOO_BASE_URL.to_string(),
            finnhub_base_url: finnhub::FINNHUB_URL.to_string(),
            binance_base_url: binance::BINANCE_API_URL.to_string(),
            coingecko_base_url: coingecko::default_base_url(coingecko_keyed).to_string(),
            gold_api_base_url: gold_api::GOLD_API_URL.to_string(),
            binance_stream_url: binance_ws::BINANCE_STREAM_URL.to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::defaults(false)
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Finnhub API key (equity secondary).
    pub finnhub_api_key: Option<String>,
    /// CoinGecko API key (optional, for pro tier).
    pub coingecko_api_key: Option<String>,
    /// GoldAPI key (commodity secondary).
    pub gold_api_key: Option<String>,
    /// Freshness window for equity, index and crypto quotes.
    pub quote_ttl: Duration,
    /// Freshness window for commodity quotes.
    pub commodity_ttl: Duration,
    /// Directory for file-backed cache persistence.
    pub cache_dir: PathBuf,
    /// Redis URL for persistent caching (preferred over files when set).
    pub redis_url: Option<String>,
    /// Delay between batch dispatches.
    pub batch_pacing: Duration,
    /// Delay before the live stream reconnects.
    pub stream_reconnect_delay: Duration,
    pub endpoints: EndpointConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let finnhub_api_key = non_empty_var("FINNHUB_API_KEY");
        let coingecko_api_key = non_empty_var("COINGECKO_API_KEY");
        let gold_api_key = non_empty_var("GOLD_API_KEY");

        let defaults = EndpointConfig::defaults(coingecko_api_key.is_some());
        let endpoints = EndpointConfig {
            yahoo_base_url: env::var("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            finnhub_base_url: env::var("FINNHUB_BASE_URL").unwrap_or(defaults.finnhub_base_url),
            binance_base_url: env::var("BINANCE_BASE_URL").unwrap_or(defaults.binance_base_url),
            coingecko_base_url: env::var("COINGECKO_BASE_URL")
                .unwrap_or(defaults.coingecko_base_url),
            gold_api_base_url: env::var("GOLD_API_BASE_URL").unwrap_or(defaults.gold_api_base_url),
            binance_stream_url: env::var("BINANCE_STREAM_URL")
                .unwrap_or(defaults.binance_stream_url),
        };

        Self {
            finnhub_api_key,
            coingecko_api_key,
            gold_api_key,
            quote_ttl: Duration::from_secs(
                env::var("QUOTE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            commodity_ttl: Duration::from_secs(
                env::var("COMMODITY_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".pricewell_cache")),
            redis_url: non_empty_var("REDIS_URL"),
            batch_pacing: Duration::from_millis(
                env::var("BATCH_PACING_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            ),
            stream_reconnect_delay: Duration::from_millis(
                env::var("STREAM_RECONNECT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
            ),
            endpoints,
        }
    }

    /// Log which keyed provider tiers are enabled. Missing keys are not fatal.
    pub fn log_provider_status(&self) {
        let tiers = [
            ("Finnhub (equity secondary)", self.finnhub_api_key.is_some()),
            ("GoldAPI (commodity secondary)", self.gold_api_key.is_some()),
        ];
        for (name, enabled) in tiers {
            if enabled {
                info!("{} enabled", name);
            } else {
                warn!("{} API key not set, tier disabled", name);
            }
        }
        if self.coingecko_api_key.is_some() {
            info!("CoinGecko pro tier enabled");
        } else {
            info!("CoinGecko using public tier");
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            coingecko_api_key: None,
            gold_api_key: None,
            quote_ttl: Duration::from_secs(300),
            commodity_ttl: Duration::from_secs(900),
            cache_dir: PathBuf::from(".pricewell_cache"),
            redis_url: None,
            batch_pacing: Duration::from_millis(100),
            stream_reconnect_delay: Duration::from_millis(3000),
            endpoints: EndpointConfig::default(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
