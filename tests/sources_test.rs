//! Provider adapters against mock HTTP servers.

use pricewell::services::{CacheTtl, ChainLink, FallbackTable, PriceResolver, QuoteCache, RetryPolicy};
use pricewell::sources::{BinanceClient, CoinGeckoClient, FinnhubClient, GoldApiClient, YahooClient};
use pricewell::{AssetClass, AssetType, FeedError, PriceSource, QuoteProvider};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crypto_resolver(provider: Arc<dyn QuoteProvider>, retry: RetryPolicy) -> PriceResolver {
    let cache = Arc::new(QuoteCache::new(CacheTtl::default()));
    PriceResolver::new(cache, FallbackTable::empty())
        .with_chain(AssetClass::Crypto, vec![ChainLink::new(provider, retry)])
}

// =============================================================================
// Binance
// =============================================================================

#[tokio::test]
async fn test_resolve_btc_through_binance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticker/24hr"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "BTCUSDT",
            "lastPrice": "95000.00",
            "priceChange": "500",
            "priceChangePercent": "0.53"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = crypto_resolver(
        Arc::new(BinanceClient::new(server.uri())),
        RetryPolicy::default(),
    );
    let quote = resolver.resolve(AssetType::Crypto, Some("BTC")).await.unwrap();

    assert_eq!(quote.price, dec!(95000));
    assert_eq!(quote.change, Some(dec!(500)));
    assert_eq!(quote.change_percent, Some(dec!(0.53)));
    assert_eq!(quote.source, PriceSource::Binance);
}

#[tokio::test]
async fn test_unknown_symbol_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticker/24hr"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"code": -1121, "msg": "Invalid symbol."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = crypto_resolver(
        Arc::new(BinanceClient::new(server.uri())),
        RetryPolicy::default(),
    );
    assert!(resolver.resolve(AssetType::Crypto, Some("NOPE")).await.is_none());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticker/24hr"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = BinanceClient::new(server.uri());
    let err = client.fetch_quote("BTC").await.unwrap_err();
    assert!(matches!(err, FeedError::Http { status: 503, .. }));
    assert!(err.is_retryable());

    let resolver = crypto_resolver(Arc::new(client), RetryPolicy::new(1, Duration::ZERO));
    assert!(resolver.resolve(AssetType::Crypto, Some("BTC")).await.is_none());
}

#[tokio::test]
async fn test_slow_response_is_retryable_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticker/24hr"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"lastPrice": "95000.00"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = BinanceClient::with_timeout(server.uri(), Duration::from_millis(100))
        .fetch_quote("BTC")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FeedError::Timeout {
            provider: PriceSource::Binance
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticker/24hr"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = BinanceClient::new(server.uri())
        .fetch_quote("BTC")
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::MalformedResponse { .. }));
}

// =============================================================================
// Yahoo
// =============================================================================

#[tokio::test]
async fn test_yahoo_chart_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chart/BRK-B"))
        .and(query_param("interval", "1d"))
        .and(query_param("range", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{"meta": {"regularMarketPrice": 110.0, "previousClose": 100.0}}],
                "error": null
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quote = YahooClient::new(server.uri())
        .fetch_quote("brk.b")
        .await
        .unwrap();
    assert_eq!(quote.price, dec!(110));
    assert_eq!(quote.change, Some(dec!(10)));
    assert_eq!(quote.change_percent, Some(dec!(10)));
}

// =============================================================================
// Finnhub
// =============================================================================

#[tokio::test]
async fn test_finnhub_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("symbol", "MSFT"))
        .and(query_param("token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "c": 420.5, "d": 1.5, "dp": 0.36, "pc": 419.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quote = FinnhubClient::new(server.uri(), Some("secret".to_string()))
        .fetch_quote("msft")
        .await
        .unwrap();
    assert_eq!(quote.price, dec!(420.5));
    assert_eq!(quote.source, PriceSource::Finnhub);
}

#[tokio::test]
async fn test_finnhub_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = FinnhubClient::new(server.uri(), Some("secret".to_string()))
        .fetch_quote("MSFT")
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert!(err.is_retryable());
}

// =============================================================================
// GoldAPI
// =============================================================================

#[tokio::test]
async fn test_gold_api_sends_access_token_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/XAU/USD"))
        .and(header("x-access-token", "gold-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metal": "XAU", "currency": "USD", "price": 2650.5, "ch": 12.0, "chp": 0.45
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quote = GoldApiClient::new(server.uri(), Some("gold-key".to_string()))
        .fetch_quote("xau")
        .await
        .unwrap();
    assert_eq!(quote.price, dec!(2650.5));
    assert_eq!(quote.change, Some(dec!(12)));
    assert_eq!(quote.source, PriceSource::GoldApi);
}

// =============================================================================
// CoinGecko
// =============================================================================

#[tokio::test]
async fn test_coingecko_simple_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "solana"))
        .and(query_param("vs_currencies", "usd"))
        .and(query_param("include_24hr_change", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "solana": {"usd": 110.0, "usd_24h_change": 10.0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quote = CoinGeckoClient::new(server.uri(), None)
        .fetch_quote("SOL")
        .await
        .unwrap();
    assert_eq!(quote.price, dec!(110));
    assert_eq!(quote.change, Some(dec!(10)));
    assert_eq!(quote.source, PriceSource::CoinGecko);
}

#[tokio::test]
async fn test_coingecko_pro_key_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("x_cg_pro_api_key", "pro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"usd": 95000.0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quote = CoinGeckoClient::new(server.uri(), Some("pro".to_string()))
        .fetch_quote("btc")
        .await
        .unwrap();
    assert_eq!(quote.price, dec!(95000));
}

#[tokio::test]
async fn test_coingecko_unknown_id_is_no_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = CoinGeckoClient::new(server.uri(), None)
        .fetch_quote("NOTACOIN")
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::NoQuote { .. }));
}

#[tokio::test]
async fn test_coingecko_429_starts_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .expect(1)
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new(server.uri(), None);
    let first = client.fetch_quote("BTC").await.unwrap_err();
    assert!(first.is_rate_limited());
    assert!(matches!(first, FeedError::CoolingDown { .. }));

    let remaining = client.cooldown_remaining().unwrap();
    assert!(remaining > Duration::from_secs(110));
    assert!(remaining <= Duration::from_secs(120));

    // No second request reaches the server while cooling down.
    let second = client.fetch_quote("BTC").await.unwrap_err();
    assert!(second.is_rate_limited());
}

#[tokio::test]
async fn test_coingecko_cooldown_skips_retry_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "60"))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = crypto_resolver(
        Arc::new(CoinGeckoClient::new(server.uri(), None)),
        RetryPolicy::tight(Duration::from_secs(2)),
    );

    let started = std::time::Instant::now();
    assert!(resolver.resolve(AssetType::Crypto, Some("ETH")).await.is_none());
    assert!(started.elapsed() < Duration::from_secs(1));
}
