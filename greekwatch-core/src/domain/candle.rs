//! Candle: a 5-minute OHLC bar aggregated from price samples.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Seconds covered by one candle.
pub const CANDLE_PERIOD_SECS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Build a candle from consecutive price samples: open is the first
    /// sample, close the last, high/low the extremes. `None` when empty.
    pub fn from_prices(timestamp: NaiveDateTime, prices: &[f64]) -> Option<Self> {
        let (&open, &close) = (prices.first()?, prices.last()?);
        let high = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = prices.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Self {
            timestamp,
            open,
            high,
            low,
            close,
        })
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// |close - open| / (high - low), 0.0 for a zero-range candle.
    pub fn body_ratio(&self) -> f64 {
        let range = self.range();
        if range == 0.0 {
            0.0
        } else {
            self.body() / range
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Floor a timestamp to the start of its candle period.
pub fn candle_start(ts: NaiveDateTime) -> NaiveDateTime {
    let secs = ts.time().num_seconds_from_midnight();
    let excess = secs % CANDLE_PERIOD_SECS;
    let floored = ts - Duration::seconds(i64::from(excess));
    floored.with_nanosecond(0).unwrap_or(floored)
}
