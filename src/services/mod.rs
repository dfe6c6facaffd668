pub mod batch;
pub mod cache;
pub mod candles;
pub mod fallback;
pub mod file_store;
pub mod market_data;
pub mod redis_store;
pub mod resolver;
pub mod retry;
pub mod store;
pub mod symbols;

pub use batch::BatchPricer;
pub use cache::{CacheEntry, CacheTtl, QuoteCache};
pub use candles::CandleFetcher;
pub use fallback::FallbackTable;
pub use file_store::FileStore;
pub use market_data::MarketDataService;
pub use redis_store::RedisStore;
pub use resolver::{ChainLink, PriceResolver, SymbolAlias};
pub use retry::RetryPolicy;
pub use store::{KeyValueStore, MemoryStore};
