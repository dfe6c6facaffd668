use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chart display period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartPeriod {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "1Y")]
    OneYear,
}

impl ChartPeriod {
    pub const ALL: [ChartPeriod; 5] = [
        ChartPeriod::OneDay,
        ChartPeriod::OneWeek,
        ChartPeriod::OneMonth,
        ChartPeriod::ThreeMonths,
        ChartPeriod::OneYear,
    ];

    /// Kline interval requested for this period.
    pub fn interval(&self) -> &'static str {
        match self {
            ChartPeriod::OneDay => "5m",
            ChartPeriod::OneWeek => "1h",
            ChartPeriod::OneMonth => "4h",
            ChartPeriod::ThreeMonths => "1d",
            ChartPeriod::OneYear => "1w",
        }
    }

    /// Number of candles requested for this period.
    pub fn limit(&self) -> u32 {
        match self {
            ChartPeriod::OneDay => 288,
            ChartPeriod::OneWeek => 168,
            ChartPeriod::OneMonth => 180,
            ChartPeriod::ThreeMonths => 90,
            ChartPeriod::OneYear => 52,
        }
    }
}

impl FromStr for ChartPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1D" => Ok(ChartPeriod::OneDay),
            "1W" => Ok(ChartPeriod::OneWeek),
            "1M" => Ok(ChartPeriod::OneMonth),
            "3M" => Ok(ChartPeriod::ThreeMonths),
            "1Y" => Ok(ChartPeriod::OneYear),
            _ => Err(format!("unknown chart period: {s}")),
        }
    }
}

/// One OHLCV bar. `time` is the bar open time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}
