use crate::config::Config;
use crate::services::batch::BatchPricer;
use crate::services::cache::{CacheTtl, QuoteCache};
use crate::services::candles::CandleFetcher;
use crate::services::file_store::FileStore;
use crate::services::redis_store::RedisStore;
use crate::services::resolver::PriceResolver;
use crate::services::store::{KeyValueStore, MemoryStore};
use crate::sources::{StreamHandle, TradeStream};
use crate::types::{AssetType, Candle, ChartPeriod, HoldingRef, PriceQuote, Tick};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Wires the cache, resolver, batch pricer, candle fetcher and live stream
/// together from one [`Config`].
pub struct MarketDataService {
    config: Config,
    cache: Arc<QuoteCache>,
    resolver: Arc<PriceResolver>,
    pricer: BatchPricer,
    candles: CandleFetcher,
}

impl MarketDataService {
    /// Build the service, attach persistence and restore cached quotes.
    ///
    /// Redis is preferred when `REDIS_URL` is set; otherwise quotes persist
    /// to files under the cache directory. If neither is usable the cache is
    /// memory-only.
    pub async fn from_config(config: &Config) -> Self {
        let store = Self::open_store(config).await;
        let ttl = CacheTtl::new(config.quote_ttl, config.commodity_ttl);
        let cache = Arc::new(QuoteCache::with_store(ttl, store));
        let restored = cache.restore().await;
        if restored > 0 {
            info!("Warm start with {} cached quotes", restored);
        }

        Self::with_cache(config, cache)
    }

    /// Build the service around an existing cache. No I/O.
    pub fn with_cache(config: &Config, cache: Arc<QuoteCache>) -> Self {
        let resolver = Arc::new(PriceResolver::from_config(config, cache.clone()));
        Self {
            config: config.clone(),
            pricer: BatchPricer::new(resolver.clone(), config.batch_pacing),
            candles: CandleFetcher::new(&config.endpoints.binance_base_url),
            cache,
            resolver,
        }
    }

    async fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
        if let Some(ref redis_url) = config.redis_url {
            let redis = RedisStore::new(redis_url).await;
            if redis.is_connected().await {
                return Arc::new(redis);
            }
        }

        match FileStore::new(&config.cache_dir).await {
            Ok(store) => {
                info!("Persisting quotes to {}", config.cache_dir.display());
                Arc::new(store)
            }
            Err(e) => {
                warn!("File persistence unavailable: {}. Caching in memory only.", e);
                Arc::new(MemoryStore::new())
            }
        }
    }

    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<PriceResolver> {
        &self.resolver
    }

    pub async fn quote(&self, asset_type: AssetType, symbol: Option<&str>) -> Option<PriceQuote> {
        self.resolver.resolve(asset_type, symbol).await
    }

    pub async fn price_holdings(&self, holdings: &[HoldingRef]) -> HashMap<String, PriceQuote> {
        self.pricer.price_holdings(holdings).await
    }

    pub async fn candles(&self, symbol: &str, period: ChartPeriod) -> Vec<Candle> {
        self.candles.fetch_candles(symbol, period).await
    }

    /// Start a live trade stream for `symbols`.
    pub fn stream<F>(&self, symbols: &[String], on_tick: F) -> StreamHandle
    where
        F: FnMut(Tick) + Send + 'static,
    {
        TradeStream::new(&self.config.endpoints.binance_stream_url, symbols)
            .with_reconnect_delay(self.config.stream_reconnect_delay)
            .start(on_tick)
    }

    /// Drop every cached quote, including persisted copies.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Quote cache cleared");
    }

    /// Evict expired entries from memory.
    pub fn cleanup(&self) -> usize {
        self.cache.cleanup()
    }
}
