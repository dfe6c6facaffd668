use crate::sources::BinanceClient;
use crate::types::{Candle, ChartPeriod};
use std::time::Duration;
use tracing::{debug, warn};

/// Candle requests get their own timeout and a single attempt.
pub const CANDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Historical candles for charting.
pub struct CandleFetcher {
    binance: BinanceClient,
}

impl CandleFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            binance: BinanceClient::with_timeout(base_url, CANDLE_TIMEOUT),
        }
    }

    /// Candles for `symbol` over `period`. Empty on any failure.
    pub async fn fetch_candles(&self, symbol: &str, period: ChartPeriod) -> Vec<Candle> {
        match self
            .binance
            .fetch_klines(symbol, period.interval(), period.limit())
            .await
        {
            Ok(candles) => {
                debug!("Fetched {} {} candles for {}", candles.len(), period.interval(), symbol);
                candles
            }
            Err(e) => {
                warn!("Failed to fetch candles for {}: {}", symbol, e);
                Vec::new()
            }
        }
    }
}
