//! Indicator trait over the candle buffer.
//!
//! Indicators are pure functions: candle history in, numeric series out.
//! The session only ever needs the most recent value, which is 0.0 while
//! the indicator is still warming up.

use crate::domain::Candle;

pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_20", "atr_14").
    fn name(&self) -> &str;

    /// Candles needed before the first valid output, minus one.
    fn lookback(&self) -> usize;

    /// Series of the same length as `candles`; the first `lookback()`
    /// entries are `f64::NAN`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;

    /// Value at the newest candle, 0.0 with insufficient history.
    fn latest(&self, candles: &[Candle]) -> f64 {
        if candles.len() <= self.lookback() {
            return 0.0;
        }
        match self.compute(candles).last() {
            Some(v) if v.is_finite() => *v,
            _ => 0.0,
        }
    }
}
