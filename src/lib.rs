//! Pricewell - market data acquisition with provider fallback chains,
//! TTL quote caching, batch portfolio pricing and live trade streams.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

pub use config::Config;
pub use error::{FeedError, Result};
pub use services::{BatchPricer, CandleFetcher, MarketDataService, PriceResolver, QuoteCache};
pub use sources::{QuoteProvider, StreamHandle, StreamState, TradeStream};
pub use types::*;
