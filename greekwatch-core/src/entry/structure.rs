//! Structure detector: breakouts and reversals in volatile markets,
//! continuation pullbacks in trending markets.
//!
//! Breakout levels are the highest swing high / lowest swing low in the
//! candle history; continuation measures against the most recent swing.

use super::{Detection, EntryDetector, EntryInput, PriceActionState};
use crate::domain::{Direction, MarketType, SetupKind, SetupPattern};
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct StructureDetector {
    breakout_min_percent: f64,
    breakout_body_min: f64,
    reversal_proximity_percent: f64,
    reversal_body_max: f64,
}

impl StructureDetector {
    pub fn new(
        breakout_min_percent: f64,
        breakout_body_min: f64,
        reversal_proximity_percent: f64,
        reversal_body_max: f64,
    ) -> Self {
        Self {
            breakout_min_percent,
            breakout_body_min,
            reversal_proximity_percent,
            reversal_body_max,
        }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self::new(
            s.breakout_min_percent,
            s.breakout_body_min,
            s.reversal_proximity_percent,
            s.reversal_body_max,
        )
    }

    fn volatile(&self, input: &EntryInput<'_>, dir: Direction, price: f64) -> Option<SetupPattern> {
        let f = input.features;
        let body = f.latest_body_ratio;
        let margin = self.breakout_min_percent / 100.0;

        let (breakout_level, reversal_level) = match dir {
            Direction::Bullish => (f.swing_high_extreme(), f.swing_low_extreme()),
            Direction::Bearish => (f.swing_low_extreme(), f.swing_high_extreme()),
        };

        if let Some(level) = breakout_level {
            let broke = match dir {
                Direction::Bullish => price > level * (1.0 + margin),
                Direction::Bearish => price < level * (1.0 - margin),
            };
            if broke && body >= self.breakout_body_min {
                return Some(SetupPattern::Breakout);
            }
        }

        if let Some(level) = reversal_level {
            let near = level != 0.0
                && ((price - level) / level).abs() * 100.0 <= self.reversal_proximity_percent;
            if near && body < self.reversal_body_max {
                return Some(SetupPattern::Reversal);
            }
        }
        None
    }

    fn trendy(&self, input: &EntryInput<'_>, dir: Direction, price: f64) -> Option<SetupPattern> {
        let f = input.features;
        let candle = f.latest_candle?;
        let holds = match dir {
            Direction::Bullish => {
                let low = f.last_swing_low()?;
                candle.is_bearish() && candle.low > low && price > low
            }
            Direction::Bearish => {
                let high = f.last_swing_high()?;
                candle.is_bullish() && candle.high < high && price < high
            }
        };
        holds.then_some(SetupPattern::Continuation)
    }
}

impl EntryDetector for StructureDetector {
    fn name(&self) -> &str {
        "structure"
    }

    fn detect(&self, input: &EntryInput<'_>, _state: &mut PriceActionState) -> Option<Detection> {
        let dir = input.direction()?;
        let price = input.features.latest_price?;
        let pattern = match input.market_type {
            MarketType::Volatile => self.volatile(input, dir, price),
            MarketType::Trendy => self.trendy(input, dir, price),
            MarketType::Neutral | MarketType::Undetermined => None,
        }?;
        Some(Detection {
            kind: SetupKind::new(pattern, dir),
            price,
        })
    }
}
