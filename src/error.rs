use crate::types::PriceSource;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while acquiring market data.
///
/// Only the provider-level variants ever leave an adapter. The public lookup
/// APIs turn exhaustion into an absent quote instead of an error.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{provider} is not configured (missing API key)")]
    Unconfigured { provider: PriceSource },

    #[error("{provider} request timed out")]
    Timeout { provider: PriceSource },

    #[error("{provider} rate limited the request")]
    RateLimited { provider: PriceSource },

    /// The provider asked us to stay away for a while; retrying sooner is pointless.
    #[error("{provider} is cooling down after a rate limit ({remaining:?} left)")]
    CoolingDown {
        provider: PriceSource,
        remaining: Duration,
    },

    #[error("{provider} returned a malformed response: {message}")]
    MalformedResponse {
        provider: PriceSource,
        message: String,
    },

    #[error("{provider} returned HTTP {status}")]
    Http { provider: PriceSource, status: u16 },

    #[error("{provider} network error: {message}")]
    Network {
        provider: PriceSource,
        message: String,
    },

    #[error("{provider} has no quote for {symbol}")]
    NoQuote {
        provider: PriceSource,
        symbol: String,
    },

    #[error("All providers exhausted for {key}")]
    AllProvidersExhausted { key: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl FeedError {
    /// Whether another attempt against the same provider could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FeedError::Unconfigured { .. }
                | FeedError::CoolingDown { .. }
                | FeedError::NoQuote { .. }
                | FeedError::AllProvidersExhausted { .. }
        )
    }

    /// Whether the provider pushed back with HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            FeedError::RateLimited { .. } | FeedError::CoolingDown { .. }
        )
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_reqwest(provider: PriceSource, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout { provider }
        } else if err.is_decode() {
            FeedError::MalformedResponse {
                provider,
                message: err.to_string(),
            }
        } else {
            FeedError::Network {
                provider,
                message: err.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// 400/404 mean the provider does not know the symbol, which no retry fixes.
    pub fn from_status(provider: PriceSource, symbol: &str, status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => FeedError::RateLimited { provider },
            400 | 404 => FeedError::NoQuote {
                provider,
                symbol: symbol.to_string(),
            },
            code => FeedError::Http {
                provider,
                status: code,
            },
        }
    }

    pub(crate) fn malformed(provider: PriceSource, message: impl Into<String>) -> Self {
        FeedError::MalformedResponse {
            provider,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_unconfigured_is_not_retryable() {
        let err = FeedError::Unconfigured {
            provider: PriceSource::Finnhub,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "finnhub is not configured (missing API key)");
    }

    #[test]
    fn test_cooldown_is_rate_limited_but_not_retryable() {
        let err = FeedError::CoolingDown {
            provider: PriceSource::CoinGecko,
            remaining: Duration::from_secs(60),
        };
        assert!(err.is_rate_limited());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(FeedError::Timeout {
            provider: PriceSource::Yahoo
        }
        .is_retryable());
        assert!(FeedError::RateLimited {
            provider: PriceSource::CoinGecko
        }
        .is_retryable());
        assert!(FeedError::malformed(PriceSource::Binance, "bad json").is_retryable());
    }

    #[test]
    fn test_status_429_is_rate_limited() {
        let err = FeedError::from_status(PriceSource::CoinGecko, "BTC", StatusCode::TOO_MANY_REQUESTS);
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_status_400_is_no_quote() {
        let err = FeedError::from_status(PriceSource::Binance, "NOPE", StatusCode::BAD_REQUEST);
        assert!(matches!(err, FeedError::NoQuote { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_status_500_is_http() {
        let err = FeedError::from_status(PriceSource::Yahoo, "AAPL", StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            FeedError::Http { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error: {other}"),
        }
    }
}
