//! Market-type classifiers.
//!
//! Condition sets are evaluated Trendy → Volatile → Neutral; the first set
//! that collects enough votes wins, otherwise Undetermined.
//!
//! Candle variant (2 of 2 each), over the last `market_type_window_size`
//! candles:
//! - Trendy:   atr_trendy_min ≤ ATR ≤ atr_trendy_max, body ≥ body_trendy_min
//! - Volatile: ATR > atr_trendy_max, body_neutral_max ≤ body < body_trendy_min
//! - Neutral:  ATR < atr_neutral_max, body < body_neutral_max
//!
//! Greek variant (3 of 5, Neutral 3 of 4) adds delta stability, gamma change
//! and IV trend to the ATR and latest body ratio.

use super::{votes, MarketTypeStrategy, RegimeInput};
use crate::domain::MarketType;
use crate::settings::Settings;

/// ATR and body-ratio bounds shared by both variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketTypeBounds {
    pub atr_neutral_max: f64,
    pub atr_trendy_min: f64,
    pub atr_trendy_max: f64,
    pub body_trendy_min: f64,
    pub body_neutral_max: f64,
}

impl MarketTypeBounds {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            atr_neutral_max: s.atr_neutral_max,
            atr_trendy_min: s.atr_trendy_min,
            atr_trendy_max: s.atr_trendy_max,
            body_trendy_min: s.body_trendy_min,
            body_neutral_max: s.body_neutral_max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandleMarketType {
    bounds: MarketTypeBounds,
    window: usize,
}

impl CandleMarketType {
    pub fn new(bounds: MarketTypeBounds, window: usize) -> Self {
        Self { bounds, window }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self::new(MarketTypeBounds::from_settings(s), s.market_type_window_size)
    }
}

impl MarketTypeStrategy for CandleMarketType {
    fn name(&self) -> &str {
        "candle"
    }

    fn classify(&self, input: &RegimeInput<'_>) -> MarketType {
        let f = input.features;
        if self.window == 0 || f.candle_count < self.window {
            return MarketType::Undetermined;
        }
        let b = &self.bounds;
        let (atr, body) = (f.window_atr, f.avg_body_ratio);

        let trendy = [
            (b.atr_trendy_min..=b.atr_trendy_max).contains(&atr),
            body >= b.body_trendy_min,
        ];
        if votes(&trendy) >= 2 {
            return MarketType::Trendy;
        }
        let volatile = [
            atr > b.atr_trendy_max,
            (b.body_neutral_max..b.body_trendy_min).contains(&body),
        ];
        if votes(&volatile) >= 2 {
            return MarketType::Volatile;
        }
        let neutral = [atr < b.atr_neutral_max, body < b.body_neutral_max];
        if votes(&neutral) >= 2 {
            return MarketType::Neutral;
        }
        MarketType::Undetermined
    }
}

#[derive(Debug, Clone)]
pub struct GreekMarketType {
    bounds: MarketTypeBounds,
    atr_period: usize,
}

impl GreekMarketType {
    pub fn new(bounds: MarketTypeBounds, atr_period: usize) -> Self {
        Self { bounds, atr_period }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self::new(MarketTypeBounds::from_settings(s), s.atr_period)
    }
}

impl MarketTypeStrategy for GreekMarketType {
    fn name(&self) -> &str {
        "greek"
    }

    fn classify(&self, input: &RegimeInput<'_>) -> MarketType {
        let f = input.features;
        if f.candle_count < self.atr_period.max(1) {
            return MarketType::Undetermined;
        }
        let b = &self.bounds;
        let (atr, body) = (f.atr, f.latest_body_ratio);

        let trendy = [
            (b.atr_trendy_min..=b.atr_trendy_max).contains(&atr),
            body >= b.body_trendy_min,
            f.delta_stability < 0.015,
            f.gamma_change >= 3.0,
            f.iv_trend >= 0.0,
        ];
        if votes(&trendy) >= 3 {
            return MarketType::Trendy;
        }
        let volatile = [
            atr > b.atr_trendy_max,
            (b.body_neutral_max..b.body_trendy_min).contains(&body),
            f.delta_stability > 0.04,
            f.gamma_change > 10.0,
            f.iv_trend > 2.0,
        ];
        if votes(&volatile) >= 3 {
            return MarketType::Volatile;
        }
        let neutral = [
            atr < b.atr_neutral_max,
            f.delta_stability.abs() < 0.005,
            f.gamma_change.abs() < 2.0,
            f.iv_trend <= 0.0,
        ];
        if votes(&neutral) >= 3 {
            return MarketType::Neutral;
        }
        MarketType::Undetermined
    }
}
