//! Feature calculators.
//!
//! Pure functions over the session's buffers: window statistics over metric
//! samples (`series`), candle indicators (`ema`, `atr`), swing structure and
//! body ratios. [`FeatureSet`] bundles everything the regime classifiers and
//! entry detectors read in one cycle; [`GreekSignals`] is the short-window
//! view used by confirmation and exit monitoring.

pub mod atr;
pub mod body;
pub mod ema;
pub mod indicator;
pub mod series;
pub mod swing;

pub use atr::Atr;
pub use body::{average_body_ratio, body_ratio};
pub use ema::Ema;
pub use indicator::Indicator;
pub use series::{change, percent_change, slope, stability};
pub use swing::{last_swing, recent_swings, swing_points, SwingKind, SwingPoint};

use serde::Serialize;

use crate::buffers::MetricBuffers;
use crate::domain::Candle;

/// Sampling interval assumed when converting seconds to updates.
pub const SAMPLE_INTERVAL_SECS: u32 = 10;

/// Size of a calculator window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Absolute number of samples.
    Samples(usize),
    /// Wall-clock span, converted with integer division by the sample interval.
    Seconds(u32),
}

impl Window {
    pub fn updates(self) -> usize {
        match self {
            Window::Samples(n) => n,
            Window::Seconds(s) => (s / SAMPLE_INTERVAL_SECS) as usize,
        }
    }
}

/// Window sizes and indicator periods for one feature pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureParams {
    pub feature_window: usize,
    pub iv_trend_window: usize,
    pub ema_period: usize,
    pub atr_period: usize,
    pub market_type_window: usize,
}

/// Everything the regime and entry layers consume in one evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureSet {
    pub delta_slope: f64,
    pub gamma_change: f64,
    pub iv_trend: f64,
    pub delta_stability: f64,
    pub theta_change: f64,
    pub ema: f64,
    pub atr: f64,
    /// ATR over the market-type window.
    pub window_atr: f64,
    pub avg_body_ratio: f64,
    pub latest_body_ratio: f64,
    pub candle_count: usize,
    pub latest_candle: Option<Candle>,
    pub swing_points: Vec<SwingPoint>,
    pub latest_price: Option<f64>,
    pub latest_premium: Option<f64>,
    pub latest_delta: Option<f64>,
    pub latest_gamma: Option<f64>,
    pub latest_iv: Option<f64>,
}

impl FeatureSet {
    pub fn compute(buffers: &MetricBuffers, candles: &[Candle], params: &FeatureParams) -> Self {
        let fw = Window::Samples(params.feature_window);
        let latest_candle = candles.last().copied();
        Self {
            delta_slope: slope(&buffers.delta, fw),
            gamma_change: percent_change(&buffers.gamma, fw),
            iv_trend: change(&buffers.iv, Window::Samples(params.iv_trend_window)),
            delta_stability: stability(&buffers.delta, fw),
            theta_change: percent_change(&buffers.theta, fw),
            ema: Ema::new(params.ema_period).latest(candles),
            atr: Atr::new(params.atr_period).latest(candles),
            window_atr: Atr::new(params.market_type_window).latest(candles),
            avg_body_ratio: average_body_ratio(candles, params.market_type_window),
            latest_body_ratio: latest_candle.as_ref().map(body_ratio).unwrap_or(0.0),
            candle_count: candles.len(),
            latest_candle,
            swing_points: swing_points(candles),
            latest_price: buffers.price.latest_value(),
            latest_premium: buffers.premium.latest_value(),
            latest_delta: buffers.delta.latest_value(),
            latest_gamma: buffers.gamma.latest_value(),
            latest_iv: buffers.iv.latest_value(),
        }
    }

    pub fn last_swing_high(&self) -> Option<f64> {
        last_swing(&self.swing_points, SwingKind::High).map(|p| p.price)
    }

    pub fn last_swing_low(&self) -> Option<f64> {
        last_swing(&self.swing_points, SwingKind::Low).map(|p| p.price)
    }

    /// Highest swing high in the candle history.
    pub fn swing_high_extreme(&self) -> Option<f64> {
        self.swing_prices(SwingKind::High).reduce(f64::max)
    }

    /// Lowest swing low in the candle history.
    pub fn swing_low_extreme(&self) -> Option<f64> {
        self.swing_prices(SwingKind::Low).reduce(f64::min)
    }

    fn swing_prices(&self, kind: SwingKind) -> impl Iterator<Item = f64> + '_ {
        self.swing_points
            .iter()
            .filter(move |p| p.kind == kind)
            .map(|p| p.price)
    }
}

/// Smoothed Greek derivatives for confirmation and exit checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GreekSignals {
    pub delta_slope: f64,
    pub gamma_change: f64,
    pub theta_change: f64,
    pub iv_change: f64,
    /// IV change over the longer exit window.
    pub iv_change_long: f64,
}

impl GreekSignals {
    pub fn compute(buffers: &MetricBuffers, short: Window, long: Window) -> Self {
        Self {
            delta_slope: slope(&buffers.delta, short),
            gamma_change: percent_change(&buffers.gamma, short),
            theta_change: percent_change(&buffers.theta, short),
            iv_change: change(&buffers.iv, short),
            iv_change_long: change(&buffers.iv, long),
        }
    }
}

/// Default tolerance for floating-point assertions in tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() < eps,
        "expected {expected}, got {actual} (eps {eps})"
    );
}

/// Candles from closes: open = previous close, high/low = body ± 1.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: start + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
            }
        })
        .collect()
}

/// Candles from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc(rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: start + chrono::Duration::minutes(5 * i as i64),
            open,
            high,
            low,
            close,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Greeks, MarketSnapshot};

    #[test]
    fn window_seconds_to_updates() {
        assert_eq!(Window::Seconds(30).updates(), 3);
        assert_eq!(Window::Seconds(65).updates(), 6);
        assert_eq!(Window::Samples(5).updates(), 5);
    }

    #[test]
    fn feature_set_on_empty_history_is_neutral() {
        let params = FeatureParams {
            feature_window: 5,
            iv_trend_window: 3,
            ema_period: 20,
            atr_period: 14,
            market_type_window: 3,
        };
        let f = FeatureSet::compute(&MetricBuffers::default(), &[], &params);
        assert_eq!(f.delta_slope, 0.0);
        assert_eq!(f.ema, 0.0);
        assert_eq!(f.atr, 0.0);
        assert!(f.latest_candle.is_none());
        assert!(f.swing_points.is_empty());
        assert_eq!(f.last_swing_high(), None);
    }

    #[test]
    fn greek_signals_short_and_long_windows() {
        let mut b = MetricBuffers::default();
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        for i in 0..6 {
            b.push(&MarketSnapshot {
                timestamp: ts,
                underlying_price: 100.0,
                strike: Some(100.0),
                premium: Some(50.0),
                greeks: Greeks {
                    delta: Some(0.4 + 0.01 * i as f64),
                    gamma: Some(0.002),
                    theta: Some(-4.0),
                    iv: Some(15.0 - i as f64),
                },
            });
        }
        let g = GreekSignals::compute(&b, Window::Seconds(30), Window::Seconds(60));
        assert_approx(g.delta_slope, 0.02 / 3.0, DEFAULT_EPSILON);
        assert_approx(g.iv_change, -2.0, DEFAULT_EPSILON);
        assert_approx(g.iv_change_long, -5.0, DEFAULT_EPSILON);
        assert_eq!(g.gamma_change, 0.0);
    }
}
