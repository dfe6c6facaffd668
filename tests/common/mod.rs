//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pricewell::services::{CacheTtl, ChainLink, FallbackTable, PriceResolver, QuoteCache, RetryPolicy};
use pricewell::{AssetClass, FeedError, PriceQuote, PriceSource, QuoteProvider, Result};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Quote(Decimal),
    /// Retryable failure on every call.
    Fail,
    Unconfigured,
}

/// Scripted provider that records every call.
pub struct FakeProvider {
    source: PriceSource,
    behavior: Behavior,
    delay: Duration,
    calls: AtomicU32,
    symbols: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(source: PriceSource, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            symbols: Mutex::new(Vec::new()),
        })
    }

    pub fn quoting(source: PriceSource, price: Decimal) -> Arc<Self> {
        Self::new(source, Behavior::Quote(price))
    }

    pub fn failing(source: PriceSource) -> Arc<Self> {
        Self::new(source, Behavior::Fail)
    }

    pub fn slow(source: PriceSource, price: Decimal, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior: Behavior::Quote(price),
            delay,
            calls: AtomicU32::new(0),
            symbols: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_symbols(&self) -> Vec<String> {
        self.symbols.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    fn source(&self) -> PriceSource {
        self.source
    }

    fn is_configured(&self) -> bool {
        !matches!(self.behavior, Behavior::Unconfigured)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.symbols.lock().unwrap().push(symbol.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.behavior {
            Behavior::Quote(price) => Ok(PriceQuote::new(price, self.source).unwrap()),
            Behavior::Fail => Err(FeedError::Timeout {
                provider: self.source,
            }),
            Behavior::Unconfigured => Err(FeedError::Unconfigured {
                provider: self.source,
            }),
        }
    }
}

pub fn link(provider: &Arc<FakeProvider>, retry: RetryPolicy) -> ChainLink {
    ChainLink::new(provider.clone(), retry)
}

/// Resolver with one chain over a fresh in-memory cache.
pub fn resolver(class: AssetClass, links: Vec<ChainLink>, fallback: FallbackTable) -> PriceResolver {
    let cache = Arc::new(QuoteCache::new(CacheTtl::default()));
    PriceResolver::new(cache, fallback).with_chain(class, links)
}
