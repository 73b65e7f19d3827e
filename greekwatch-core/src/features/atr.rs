//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), with the
//! first candle's TR = high - low.
//! ATR is the simple mean of the last `period` true ranges.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    /// A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// TR[0] = high[0] - low[0]; TR[t] uses the previous close.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(candles.len());
    for (i, c) in candles.iter().enumerate() {
        let hl = c.high - c.low;
        if i == 0 {
            tr.push(hl);
        } else {
            let pc = candles[i - 1].close;
            tr.push(hl.max((c.high - pc).abs()).max((c.low - pc).abs()));
        }
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let tr = true_range(candles);
        let mut result = vec![f64::NAN; tr.len()];
        if tr.len() < self.period {
            return result;
        }
        let mut sum: f64 = tr[..self.period].iter().sum();
        result[self.period - 1] = sum / self.period as f64;
        for i in self.period..tr.len() {
            sum += tr[i] - tr[i - self.period];
            result[i] = sum / self.period as f64;
        }
        result
    }
}
