//! Candle body ratios.

use crate::domain::Candle;

/// |close - open| / (high - low), 0.0 for a zero-range candle.
pub fn body_ratio(candle: &Candle) -> f64 {
    candle.body_ratio()
}

/// Mean body ratio of the last `window` candles, 0.0 if fewer are available.
pub fn average_body_ratio(candles: &[Candle], window: usize) -> f64 {
    if window == 0 || candles.len() < window {
        return 0.0;
    }
    let tail = &candles[candles.len() - window..];
    tail.iter().map(body_ratio).sum::<f64>() / window as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{assert_approx, make_ohlc, DEFAULT_EPSILON};

    #[test]
    fn average_over_tail() {
        let candles = make_ohlc(&[
            (100.0, 110.0, 100.0, 110.0), // 1.0, outside window
            (100.0, 104.0, 100.0, 102.0), // 0.5
            (100.0, 110.0, 100.0, 100.0), // 0.0
        ]);
        assert_approx(average_body_ratio(&candles, 2), 0.25, DEFAULT_EPSILON);
    }

    #[test]
    fn short_history_is_zero() {
        let candles = make_ohlc(&[(100.0, 110.0, 100.0, 110.0)]);
        assert_eq!(average_body_ratio(&candles, 3), 0.0);
        assert_eq!(average_body_ratio(&candles, 0), 0.0);
    }
}
