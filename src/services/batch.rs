use crate::services::resolver::PriceResolver;
use crate::types::{CacheKey, HoldingRef, PriceQuote};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Prices a whole portfolio.
///
/// Holdings sharing a cache key are resolved once. Per-symbol lookups are
/// dispatched concurrently with a fixed pause between dispatches to stay
/// under third-party rate limits; class-level commodity lookups are not paced.
pub struct BatchPricer {
    resolver: Arc<PriceResolver>,
    pacing: Duration,
}

impl BatchPricer {
    pub fn new(resolver: Arc<PriceResolver>, pacing: Duration) -> Self {
        Self { resolver, pacing }
    }

    /// Quotes keyed by holding id. Holdings that could not be priced are absent.
    pub async fn price_holdings(&self, holdings: &[HoldingRef]) -> HashMap<String, PriceQuote> {
        let mut groups: BTreeMap<CacheKey, Vec<String>> = BTreeMap::new();
        for holding in holdings {
            match holding.cache_key() {
                Some(key) => groups.entry(key).or_default().push(holding.id.clone()),
                None => debug!("Holding {} ({}) is not priced live", holding.id, holding.asset_type),
            }
        }

        let mut tasks = JoinSet::new();
        let mut dispatched_per_symbol = false;
        for key in groups.keys() {
            if key.class.is_per_symbol() {
                if dispatched_per_symbol && !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                dispatched_per_symbol = true;
            }

            let resolver = self.resolver.clone();
            let key = key.clone();
            tasks.spawn(async move {
                let quote = resolver.resolve_key(&key).await;
                (key, quote)
            });
        }

        let mut quotes = HashMap::with_capacity(holdings.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, Some(quote))) => {
                    for id in groups.get(&key).into_iter().flatten() {
                        quotes.insert(id.clone(), quote.clone());
                    }
                }
                Ok((key, None)) => debug!("No quote for {}", key),
                Err(e) => warn!("Batch lookup task failed: {}", e),
            }
        }

        info!(
            "Priced {}/{} holdings from {} distinct lookups",
            quotes.len(),
            holdings.len(),
            groups.len()
        );
        quotes
    }
}
