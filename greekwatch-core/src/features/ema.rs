//! Exponential Moving Average (EMA) of candle closes.
//!
//! alpha = 2 / (period + 1)
//! Seed: EMA[0] = close[0]; EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//! (recursive form without bias adjustment). Valid from index period-1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    /// A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let mut result = ema_of_series(&closes, self.period);
        for v in result.iter_mut().take(self.lookback()) {
            *v = f64::NAN;
        }
        result
    }
}

/// Recursive EMA of an arbitrary series, seeded with its first value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        result.push(next);
        prev = Some(next);
    }
    result
}
