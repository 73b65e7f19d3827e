//! Bias classifiers.
//!
//! Baseline-relative: compare the latest price and Greeks with the session
//! baseline. Bullish needs enough of {price up, delta up, gamma up, IV not
//! down beyond the tolerance}; bearish needs enough of {price down, delta
//! down, gamma up, IV up beyond the tolerance}. Neutral until a baseline
//! exists.
//!
//! Structural: six-condition vote of higher highs, higher lows, price vs EMA,
//! delta slope, gamma change and IV trend (mirrored for bearish).

use super::{votes, BiasStrategy, RegimeInput};
use crate::domain::Bias;
use crate::features::{recent_swings, SwingKind};
use crate::settings::Settings;

/// Swings of each kind compared for higher highs / lower lows.
const STRUCTURE_SWINGS: usize = 3;

#[derive(Debug, Clone)]
pub struct BaselineBias {
    min_conditions: usize,
    iv_tolerance: f64,
}

impl BaselineBias {
    pub fn new(min_conditions: usize, iv_tolerance: f64) -> Self {
        Self {
            min_conditions,
            iv_tolerance,
        }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self::new(s.bias_baseline_min_conditions, s.bias_iv_tolerance)
    }
}

impl BiasStrategy for BaselineBias {
    fn name(&self) -> &str {
        "baseline"
    }

    fn classify(&self, input: &RegimeInput<'_>) -> Bias {
        let Some(base) = input.baseline else {
            return Bias::Neutral;
        };
        let f = input.features;
        let Some(price) = f.latest_price else {
            return Bias::Neutral;
        };
        // A missing Greek simply fails its condition.
        let delta = |cmp: fn(f64, f64) -> bool| f.latest_delta.is_some_and(|d| cmp(d, base.delta));
        let gamma_up = f.latest_gamma.is_some_and(|g| g > base.gamma);
        let iv_change = f.latest_iv.map(|iv| iv - base.iv);

        let bullish = [
            price > base.price,
            delta(|d, b| d > b),
            gamma_up,
            iv_change.is_some_and(|c| c >= -self.iv_tolerance),
        ];
        if votes(&bullish) >= self.min_conditions {
            return Bias::Bullish;
        }

        let bearish = [
            price < base.price,
            delta(|d, b| d < b),
            gamma_up,
            iv_change.is_some_and(|c| c > self.iv_tolerance),
        ];
        if votes(&bearish) >= self.min_conditions {
            return Bias::Bearish;
        }
        Bias::Neutral
    }
}

#[derive(Debug, Clone)]
pub struct StructuralBias {
    delta_slope: f64,
    gamma_change: f64,
    min_conditions: usize,
}

impl StructuralBias {
    pub fn new(delta_slope: f64, gamma_change: f64, min_conditions: usize) -> Self {
        Self {
            delta_slope,
            gamma_change,
            min_conditions,
        }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self::new(s.bias_delta_slope, s.bias_gamma_change, s.bias_min_conditions)
    }
}

fn strictly_rising(v: &[f64]) -> bool {
    v.windows(2).all(|w| w[1] > w[0])
}

fn strictly_falling(v: &[f64]) -> bool {
    v.windows(2).all(|w| w[1] < w[0])
}

impl BiasStrategy for StructuralBias {
    fn name(&self) -> &str {
        "structural"
    }

    fn classify(&self, input: &RegimeInput<'_>) -> Bias {
        let f = input.features;
        let price = match f.latest_price {
            Some(p) if f.ema != 0.0 => p,
            _ => return Bias::Neutral,
        };
        let highs = recent_swings(&f.swing_points, SwingKind::High, STRUCTURE_SWINGS);
        let lows = recent_swings(&f.swing_points, SwingKind::Low, STRUCTURE_SWINGS);

        let bullish = [
            highs.as_deref().is_some_and(strictly_rising),
            lows.as_deref().is_some_and(strictly_rising),
            price > f.ema,
            f.delta_slope >= self.delta_slope,
            f.gamma_change >= self.gamma_change,
            f.iv_trend >= 0.0,
        ];
        if votes(&bullish) >= self.min_conditions {
            return Bias::Bullish;
        }

        let bearish = [
            highs.as_deref().is_some_and(strictly_falling),
            lows.as_deref().is_some_and(strictly_falling),
            price < f.ema,
            f.delta_slope <= -self.delta_slope,
            f.gamma_change <= -self.gamma_change,
            f.iv_trend <= 0.0,
        ];
        if votes(&bearish) >= self.min_conditions {
            return Bias::Bearish;
        }
        Bias::Neutral
    }
}
