//! Break-of-structure + retest detector.
//!
//! State machine over 5-minute candles:
//! - `LookingForBos`: a close beyond the swing extreme by `bos_buffer_points`
//!   is a break. Volatile markets take it immediately (`BOS_*`); trending
//!   markets record the breakout and wait for a retest.
//! - `LookingForRetest`: the impulse leg runs from the broken level to the
//!   breakout extreme and extends while price makes new extremes. A candle
//!   that retraces between `retest_min_percent` and `retest_max_percent` of
//!   the leg while closing on the right side of the level is a retest
//!   (`Retest_*`). Closing back through the level, or retracing too deep,
//!   invalidates the breakout.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::{Detection, EntryDetector, EntryInput};
use crate::domain::{Candle, Direction, MarketType, SetupKind, SetupPattern};
use crate::settings::Settings;

/// A recorded structural break awaiting its retest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakoutRecord {
    pub direction: Direction,
    /// Swing level that was broken.
    pub level: f64,
    /// Furthest price reached by the impulse so far.
    pub extreme: f64,
    /// Candle that produced (or last extended) the break.
    pub candle_time: NaiveDateTime,
}

impl BreakoutRecord {
    fn impulse(&self) -> f64 {
        (self.extreme - self.level) * self.direction.sign()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub enum PriceActionState {
    #[default]
    LookingForBos,
    LookingForRetest(BreakoutRecord),
}

impl PriceActionState {
    pub fn reset(&mut self) {
        *self = PriceActionState::LookingForBos;
    }
}

#[derive(Debug, Clone)]
pub struct BosRetestDetector {
    buffer_points: f64,
    retest_min_percent: f64,
    retest_max_percent: f64,
}

impl BosRetestDetector {
    pub fn new(buffer_points: f64, retest_min_percent: f64, retest_max_percent: f64) -> Self {
        Self {
            buffer_points,
            retest_min_percent,
            retest_max_percent,
        }
    }

    pub fn from_settings(s: &Settings) -> Self {
        Self::new(s.bos_buffer_points, s.retest_min_percent, s.retest_max_percent)
    }

    fn look_for_bos(
        &self,
        input: &EntryInput<'_>,
        dir: Direction,
        candle: &Candle,
        state: &mut PriceActionState,
    ) -> Option<SetupPattern> {
        let f = input.features;
        let level = match dir {
            Direction::Bullish => f.swing_high_extreme()?,
            Direction::Bearish => f.swing_low_extreme()?,
        };
        let broke = match dir {
            Direction::Bullish => candle.close > level + self.buffer_points,
            Direction::Bearish => candle.close < level - self.buffer_points,
        };
        if !broke {
            return None;
        }
        match input.market_type {
            MarketType::Volatile => Some(SetupPattern::Bos),
            _ => {
                let extreme = match dir {
                    Direction::Bullish => candle.high,
                    Direction::Bearish => candle.low,
                };
                *state = PriceActionState::LookingForRetest(BreakoutRecord {
                    direction: dir,
                    level,
                    extreme,
                    candle_time: candle.timestamp,
                });
                None
            }
        }
    }

    fn look_for_retest(
        &self,
        mut record: BreakoutRecord,
        candle: &Candle,
        state: &mut PriceActionState,
    ) -> Option<SetupPattern> {
        if candle.timestamp <= record.candle_time {
            return None;
        }
        let dir = record.direction;
        let (new_extreme, pullback, closed_through) = match dir {
            Direction::Bullish => (
                candle.high > record.extreme,
                candle.low,
                candle.close < record.level,
            ),
            Direction::Bearish => (
                candle.low < record.extreme,
                candle.high,
                candle.close > record.level,
            ),
        };

        if closed_through || record.impulse() <= 0.0 {
            state.reset();
            return None;
        }
        if new_extreme {
            record.extreme = match dir {
                Direction::Bullish => candle.high,
                Direction::Bearish => candle.low,
            };
            record.candle_time = candle.timestamp;
            *state = PriceActionState::LookingForRetest(record);
            return None;
        }

        let retrace = (record.extreme - pullback) * dir.sign() / record.impulse() * 100.0;
        if retrace > self.retest_max_percent {
            state.reset();
            None
        } else if retrace >= self.retest_min_percent {
            state.reset();
            Some(SetupPattern::Retest)
        } else {
            None
        }
    }
}

impl EntryDetector for BosRetestDetector {
    fn name(&self) -> &str {
        "bos_retest"
    }

    fn detect(&self, input: &EntryInput<'_>, state: &mut PriceActionState) -> Option<Detection> {
        let dir = input.direction()?;
        let candle = input.features.latest_candle?;
        let price = input.features.latest_price?;

        let pattern = match *state {
            PriceActionState::LookingForRetest(record) if record.direction != dir => {
                // Bias flipped against the recorded break.
                state.reset();
                self.look_for_bos(input, dir, &candle, state)
            }
            PriceActionState::LookingForRetest(record) => {
                self.look_for_retest(record, &candle, state)
            }
            PriceActionState::LookingForBos => self.look_for_bos(input, dir, &candle, state),
        }?;

        Some(Detection {
            kind: SetupKind::new(pattern, dir),
            price,
        })
    }
}
