//! Binance combined trade stream.
//!
//! One WebSocket carries the trades of every subscribed symbol. Frames are
//! demultiplexed by trading pair and handed to the caller's callback as they
//! arrive. A dropped connection is reopened after a fixed delay with the same
//! symbol set until the handle is closed.

use crate::error::{FeedError, Result};
use crate::types::price::parse_decimal;
use crate::types::Tick;
use chrono::{TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub const BINANCE_STREAM_URL: &str = "wss://stream.binance.com:9443";

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Quote currencies stripped from a pair to recover the bare symbol.
const QUOTE_SUFFIXES: &[&str] = &["USDT", "BUSD", "USDC", "USD"];

/// Combined-stream envelope: `{"stream": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
struct CombinedFrame {
    data: TradeEvent,
}

#[derive(Debug, Deserialize)]
struct TradeEvent {
    /// Trading pair
    #[serde(rename = "s")]
    pair: String,
    /// Price
    #[serde(rename = "p")]
    price: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Lifecycle of a stream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    /// Disconnected, waiting out the reconnect delay.
    Reconnecting,
    /// Torn down by the caller. Terminal.
    Closed,
}

/// Strip the quote currency from a trading pair (`BTCUSDT` -> `BTC`).
pub fn bare_symbol(pair: &str) -> String {
    let pair = pair.trim().to_uppercase();
    QUOTE_SUFFIXES
        .iter()
        .filter_map(|suffix| pair.strip_suffix(suffix))
        .find(|base| !base.is_empty())
        .map(str::to_string)
        .unwrap_or(pair)
}

/// Parse one combined-stream trade frame. Anything else yields `None`.
pub fn parse_trade_frame(text: &str) -> Option<Tick> {
    let frame: CombinedFrame = serde_json::from_str(text).ok()?;
    let event = frame.data;
    let price = parse_decimal(&event.price).filter(|p| *p > Decimal::ZERO)?;
    let timestamp = Utc.timestamp_millis_opt(event.trade_time).single()?;

    Some(Tick {
        symbol: bare_symbol(&event.pair),
        price,
        timestamp,
    })
}

/// A live trade subscription for a fixed set of symbols.
///
/// The symbol set cannot change once started; tear the stream down and
/// build a new one instead.
#[derive(Debug, Clone)]
pub struct TradeStream {
    base_url: String,
    symbols: Vec<String>,
    reconnect_delay: Duration,
}

impl TradeStream {
    /// Symbols are upper-cased and deduplicated, keeping first-seen order.
    pub fn new(base_url: impl Into<String>, symbols: &[String]) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() && !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        Self {
            base_url: base_url.into(),
            symbols: unique,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Combined-stream URL covering every symbol.
    pub fn stream_url(&self) -> String {
        let streams: Vec<String> = self
            .symbols
            .iter()
            .map(|s| format!("{}usdt@trade", s.to_lowercase()))
            .collect();
        format!(
            "{}/stream?streams={}",
            self.base_url.trim_end_matches('/'),
            streams.join("/")
        )
    }

    /// Open the stream in a background task.
    ///
    /// `on_tick` runs on that task for every trade, in arrival order.
    pub fn start<F>(self, on_tick: F) -> StreamHandle
    where
        F: FnMut(Tick) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let attempts = Arc::new(AtomicU32::new(0));

        if self.symbols.is_empty() {
            warn!("Trade stream started with no symbols, nothing to subscribe");
            let (_, state_rx) = watch::channel(StreamState::Closed);
            shutdown_tx.send_replace(true);
            return StreamHandle {
                shutdown: shutdown_tx,
                state: state_rx,
                attempts,
                task: None,
            };
        }

        let (state_tx, state_rx) = watch::channel(StreamState::Connecting);
        let task = tokio::spawn(self.run(on_tick, shutdown_rx, state_tx, attempts.clone()));

        StreamHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            attempts,
            task: Some(task),
        }
    }

    async fn run<F>(
        self,
        mut on_tick: F,
        mut shutdown: watch::Receiver<bool>,
        state: watch::Sender<StreamState>,
        attempts: Arc<AtomicU32>,
    ) where
        F: FnMut(Tick) + Send + 'static,
    {
        let url = self.stream_url();

        loop {
            if is_shut_down(&shutdown) {
                break;
            }
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("Trade stream connect attempt {}", attempt);

            match self.session(&url, &mut on_tick, &mut shutdown, &state).await {
                Ok(()) => {
                    if !is_shut_down(&shutdown) {
                        warn!("Binance trade stream disconnected, reconnecting...");
                    }
                }
                Err(e) => error!("Binance trade stream error: {}, reconnecting...", e),
            }

            // Teardown wins over reconnect.
            if is_shut_down(&shutdown) {
                break;
            }
            state.send_replace(StreamState::Reconnecting);
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        state.send_replace(StreamState::Closed);
        info!("Binance trade stream closed");
    }

    async fn session<F>(
        &self,
        url: &str,
        on_tick: &mut F,
        shutdown: &mut watch::Receiver<bool>,
        state: &watch::Sender<StreamState>,
    ) -> Result<()>
    where
        F: FnMut(Tick) + Send,
    {
        info!("Connecting to Binance trade stream ({} symbols)", self.symbols.len());
        let ws_stream = tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => return Ok(()),
            connected = connect_async(url) => {
                connected.map_err(|e| FeedError::Stream(e.to_string()))?.0
            }
        };
        let (mut write, mut read) = ws_stream.split();
        state.send_replace(StreamState::Open);
        info!("Connected to Binance trade stream");

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown) => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(tick) = parse_trade_frame(&text) {
                                on_tick(tick);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("Binance trade stream closed by server");
                            return Ok(());
                        }
                        Some(Err(e)) => return Err(FeedError::Stream(e.to_string())),
                        None => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }
}

fn is_shut_down(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Resolves once shutdown is requested or the handle is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Cleanup handle for a running [`TradeStream`].
///
/// Dropping the handle closes the stream.
pub struct StreamHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<StreamState>,
    attempts: Arc<AtomicU32>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Stop the stream. Safe to call repeatedly and before the first connect.
    pub fn close(&self) {
        if !self.shutdown.send_replace(true) {
            debug!("Trade stream close requested");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Number of connection attempts made so far, including the first.
    pub fn connect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Close the stream and wait for its task to finish.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Trade stream task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // =========================================================================
    // Frame Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_trade_frame() {
        let json = r#"{
            "stream": "btcusdt@trade",
            "data": {"e": "trade", "E": 1700000000100, "s": "BTCUSDT", "t": 12345,
                     "p": "95000.50", "q": "0.01", "T": 1700000000000, "m": true}
        }"#;
        let tick = parse_trade_frame(json).unwrap();
        assert_eq!(tick.symbol, "BTC");
        assert_eq!(tick.price, dec!(95000.50));
        assert_eq!(tick.timestamp.timestamp_millis(), 1700000000000);
    }

    #[test]
    fn test_parse_ignores_non_trade_frames() {
        assert!(parse_trade_frame(r#"{"result": null, "id": 1}"#).is_none());
        assert!(parse_trade_frame("not json").is_none());
    }

    #[test]
    fn test_parse_rejects_zero_price() {
        let json = r#"{"data": {"s": "BTCUSDT", "p": "0", "T": 1700000000000}}"#;
        assert!(parse_trade_frame(json).is_none());
    }

    #[test]
    fn test_bare_symbol_strips_quote_currency() {
        assert_eq!(bare_symbol("BTCUSDT"), "BTC");
        assert_eq!(bare_symbol("ethbusd"), "ETH");
        assert_eq!(bare_symbol("SOLUSD"), "SOL");
        assert_eq!(bare_symbol("USDT"), "USDT");
    }

    // =========================================================================
    // TradeStream Tests
    // =========================================================================

    #[test]
    fn test_stream_url_multiplexes_symbols() {
        let symbols = vec!["BTC".to_string(), "eth".to_string(), "btc".to_string()];
        let stream = TradeStream::new(BINANCE_STREAM_URL, &symbols);
        assert_eq!(stream.symbols(), &["BTC".to_string(), "ETH".to_string()]);
        assert_eq!(
            stream.stream_url(),
            "wss://stream.binance.com:9443/stream?streams=btcusdt@trade/ethusdt@trade"
        );
    }

    #[tokio::test]
    async fn test_empty_symbol_set_never_connects() {
        let handle = TradeStream::new(BINANCE_STREAM_URL, &[]).start(|_| {});
        assert_eq!(handle.state(), StreamState::Closed);
        assert_eq!(handle.connect_attempts(), 0);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_close_before_open_is_idempotent() {
        let stream = TradeStream::new("ws://127.0.0.1:1", &["BTC".to_string()])
            .with_reconnect_delay(Duration::from_secs(60));
        let handle = stream.start(|_| {});

        handle.close();
        handle.close();
        assert!(handle.is_closed());

        let mut state = handle.watch_state();
        handle.shutdown().await;
        assert_eq!(*state.borrow_and_update(), StreamState::Closed);
    }
}
