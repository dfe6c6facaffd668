//! Per-class provider fallback chains.
//!
//! A lookup goes cache -> chain links in declared order (each through the
//! retry executor) -> static fallback table. The first live success wins and
//! is written through to the cache. Exhaustion is reported as `None`.

use crate::config::Config;
use crate::error::FeedError;
use crate::services::cache::QuoteCache;
use crate::services::fallback::FallbackTable;
use crate::services::retry::{self, RetryPolicy};
use crate::services::symbols;
use crate::sources::{
    BinanceClient, CoinGeckoClient, FinnhubClient, GoldApiClient, QuoteProvider, YahooClient,
};
use crate::types::{AssetClass, AssetType, CacheKey, PriceQuote, PriceSource};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// How a chain link rewrites the cache symbol before calling its provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolAlias {
    AsIs,
    /// Commodity name to futures contract (`GOLD` -> `GC=F`).
    FuturesContract,
    /// Commodity name to metal code (`GOLD` -> `XAU`).
    MetalCode,
}

impl SymbolAlias {
    pub fn apply(&self, symbol: &str) -> Option<String> {
        match self {
            SymbolAlias::AsIs => Some(symbol.to_string()),
            SymbolAlias::FuturesContract => symbols::futures_contract(symbol).map(str::to_string),
            SymbolAlias::MetalCode => symbols::metal_code(symbol).map(str::to_string),
        }
    }
}

/// One tier of a chain: a provider and the retry budget it gets.
#[derive(Clone)]
pub struct ChainLink {
    pub provider: Arc<dyn QuoteProvider>,
    pub retry: RetryPolicy,
    pub alias: SymbolAlias,
}

impl ChainLink {
    pub fn new(provider: Arc<dyn QuoteProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            alias: SymbolAlias::AsIs,
        }
    }

    pub fn with_alias(mut self, alias: SymbolAlias) -> Self {
        self.alias = alias;
        self
    }
}

/// Resolves asset identifiers to quotes.
pub struct PriceResolver {
    cache: Arc<QuoteCache>,
    chains: HashMap<AssetClass, Vec<ChainLink>>,
    fallback: FallbackTable,
    /// Per-key outcome of the chain walk currently in flight. Concurrent cold
    /// lookups share it, whether it ends in a live quote, a fallback or `None`.
    inflight: DashMap<CacheKey, Arc<OnceCell<Option<PriceQuote>>>>,
}

impl PriceResolver {
    /// A resolver with no chains; every lookup falls straight to `fallback`.
    pub fn new(cache: Arc<QuoteCache>, fallback: FallbackTable) -> Self {
        Self {
            cache,
            chains: HashMap::new(),
            fallback,
            inflight: DashMap::new(),
        }
    }

    /// Set the chain for a class, replacing any existing one.
    ///
    /// Index lookups use the equity chain.
    pub fn with_chain(mut self, class: AssetClass, links: Vec<ChainLink>) -> Self {
        self.chains.insert(class, links);
        self
    }

    /// The standard chains wired to the configured endpoints and keys.
    pub fn from_config(config: &Config, cache: Arc<QuoteCache>) -> Self {
        let endpoints = &config.endpoints;
        let yahoo: Arc<dyn QuoteProvider> = Arc::new(YahooClient::new(&endpoints.yahoo_base_url));
        let finnhub: Arc<dyn QuoteProvider> = Arc::new(FinnhubClient::new(
            &endpoints.finnhub_base_url,
            config.finnhub_api_key.clone(),
        ));
        let binance: Arc<dyn QuoteProvider> =
            Arc::new(BinanceClient::new(&endpoints.binance_base_url));
        let coingecko: Arc<dyn QuoteProvider> = Arc::new(CoinGeckoClient::new(
            &endpoints.coingecko_base_url,
            config.coingecko_api_key.clone(),
        ));
        let gold_api: Arc<dyn QuoteProvider> = Arc::new(GoldApiClient::new(
            &endpoints.gold_api_base_url,
            config.gold_api_key.clone(),
        ));

        let tight = RetryPolicy::tight(Duration::from_secs(1));

        Self::new(cache, FallbackTable::builtin())
            .with_chain(
                AssetClass::Equity,
                vec![
                    ChainLink::new(yahoo.clone(), tight),
                    ChainLink::new(finnhub, tight),
                ],
            )
            .with_chain(
                AssetClass::Crypto,
                vec![
                    ChainLink::new(binance, RetryPolicy::default()),
                    ChainLink::new(coingecko, RetryPolicy::tight(Duration::from_secs(2))),
                ],
            )
            .with_chain(
                AssetClass::Commodity,
                vec![
                    ChainLink::new(yahoo, tight).with_alias(SymbolAlias::FuturesContract),
                    ChainLink::new(gold_api, tight).with_alias(SymbolAlias::MetalCode),
                ],
            )
    }

    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    /// Providers tried for a class, in order.
    pub fn chain_sources(&self, class: AssetClass) -> Vec<PriceSource> {
        self.links_for(class)
            .iter()
            .map(|link| link.provider.source())
            .collect()
    }

    /// Quote for a holding's asset type and symbol.
    ///
    /// `None` for manually priced types, missing symbols and total exhaustion.
    pub async fn resolve(&self, asset_type: AssetType, symbol: Option<&str>) -> Option<PriceQuote> {
        let Some(key) = CacheKey::for_asset(asset_type, symbol) else {
            debug!("{} {:?} is not priced live", asset_type, symbol);
            return None;
        };
        self.resolve_key(&key).await
    }

    pub async fn resolve_key(&self, key: &CacheKey) -> Option<PriceQuote> {
        if key.class == AssetClass::Manual {
            return None;
        }
        if let Some(quote) = self.cached(key) {
            return Some(quote);
        }

        let flight = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let mut led = false;
        let outcome = flight
            .get_or_init(|| {
                led = true;
                async {
                    // A previous flight may have filled the cache since our check.
                    match self.cached(key) {
                        Some(quote) => Some(quote),
                        None => self.walk_chain(key).await,
                    }
                }
            })
            .await
            .clone();

        self.inflight
            .remove_if(key, |_, current| Arc::ptr_eq(current, &flight));

        match outcome {
            Some(quote) if !led && quote.source.is_live() => {
                Some(quote.with_source(PriceSource::Cache))
            }
            outcome => outcome,
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<PriceQuote> {
        let quote = self.cache.get(key)?;
        debug!("{} served from cache (origin {})", key, quote.source);
        Some(quote.with_source(PriceSource::Cache))
    }

    fn links_for(&self, class: AssetClass) -> &[ChainLink] {
        let class = match class {
            AssetClass::Index => AssetClass::Equity,
            class => class,
        };
        self.chains.get(&class).map(Vec::as_slice).unwrap_or_default()
    }

    async fn walk_chain(&self, key: &CacheKey) -> Option<PriceQuote> {
        let symbol = match key.class {
            AssetClass::Index => symbols::index_proxy(&key.symbol).to_string(),
            _ => key.symbol.clone(),
        };

        for (tier, link) in self.links_for(key.class).iter().enumerate() {
            let source = link.provider.source();
            if !link.provider.is_configured() {
                debug!("{}: {} not configured, skipping", key, source);
                continue;
            }
            let Some(provider_symbol) = link.alias.apply(&symbol) else {
                debug!("{}: no {} alias for {}, skipping", key, source, symbol);
                continue;
            };

            let label = format!("{} {}", source, provider_symbol);
            let attempt = || link.provider.fetch_quote(&provider_symbol);
            match retry::execute(link.retry, &label, attempt).await {
                Ok(quote) => {
                    info!("{} resolved by {} (tier {})", key, source, tier + 1);
                    self.cache.put(key, quote.clone()).await;
                    return Some(quote);
                }
                Err(FeedError::Unconfigured { .. }) => {
                    debug!("{}: {} not configured, skipping", key, source);
                }
                Err(e) => warn!("{}: {} failed: {}", key, source, e),
            }
        }

        let fallback = self.fallback.lookup(key).or_else(|| {
            (key.class == AssetClass::Index)
                .then(|| self.fallback.lookup(&CacheKey::new(AssetClass::Equity, &symbol)))
                .flatten()
        });
        match fallback {
            Some(quote) => {
                warn!("{}: live providers exhausted, using fallback price", key);
                Some(quote)
            }
            None => {
                warn!("{}", FeedError::AllProvidersExhausted { key: key.to_string() });
                None
            }
        }
    }
}
