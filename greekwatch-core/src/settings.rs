//! Settings schema.
//!
//! Settings arrive as a flat string map that an operator may edit at any
//! time. Every key is declared once below with its type and default; the
//! map is parsed into a typed [`Settings`] at the boundary, so calculators
//! never see raw strings. Missing keys take their default. Unknown keys and
//! unparsable values are errors.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use thiserror::Error;

use crate::entry::EntryStrategyKind;
use crate::features::{FeatureParams, Window};
use crate::regime::{BiasStrategyKind, MarketTypeStrategyKind};

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value:?} (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// One row of the settings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingSpec {
    pub key: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
}

fn parse_value<T: FromStr>(key: &str, value: &str, expected: &'static str) -> Result<T, SettingsError> {
    let invalid = || SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    };
    let raw = value.trim();
    // NaN and infinities parse as f64 but fail every threshold comparison.
    if raw.parse::<f64>().is_ok_and(|v| !v.is_finite()) {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}

macro_rules! settings_schema {
    ($( $(#[doc = $doc:literal])* $key:ident : $ty:ty = $default:expr ; )*) => {
        /// Typed snapshot of every tunable threshold, read once per cycle.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct Settings {
            $( $(#[doc = $doc])* pub $key: $ty, )*
        }

        impl Default for Settings {
            fn default() -> Self {
                Self { $( $key: $default, )* }
            }
        }

        /// Every known key, in declaration order.
        pub const SCHEMA: &[SettingSpec] = &[
            $( SettingSpec {
                key: stringify!($key),
                kind: stringify!($ty),
                description: concat!("" $(, $doc)*),
            }, )*
        ];

        impl Settings {
            fn apply(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
                match key {
                    $( stringify!($key) => {
                        self.$key = parse_value(key, value, stringify!($ty))?;
                    } )*
                    _ => return Err(SettingsError::UnknownKey(key.to_string())),
                }
                Ok(())
            }

            /// Render back to the string form used by settings stores.
            pub fn to_map(&self) -> BTreeMap<String, String> {
                let mut map = BTreeMap::new();
                $( map.insert(stringify!($key).to_string(), self.$key.to_string()); )*
                map
            }
        }
    };
}

settings_schema! {
    // Trade management
    /// Reward multiple applied to the stop distance for the target.
    risk_reward_ratio: f64 = 2.0;
    /// Stop distance as a percent of the entry premium.
    risk_percent: f64 = 1.0;
    /// Quiet period after an exit, in minutes.
    cooldown_minutes: u32 = 15;
    /// Force exits this many minutes before market close.
    eod_exit_minutes: u32 = 60;
    /// Delay after session start before the baseline is captured.
    baseline_delay_minutes: u32 = 15;
    /// Strikes above ATM for the monitored call.
    strike_otm_offset: usize = 2;

    // Strategy selection
    /// Bias classifier: baseline | structural.
    bias_strategy: BiasStrategyKind = BiasStrategyKind::Baseline;
    /// Market-type classifier: candle | greek.
    market_type_strategy: MarketTypeStrategyKind = MarketTypeStrategyKind::Candle;
    /// Entry detector: structure | bos_retest.
    entry_strategy: EntryStrategyKind = EntryStrategyKind::Structure;

    // Feature windows
    /// Samples used for regime Greek slopes, changes and stability.
    feature_window_updates: usize = 5;
    /// Samples used for the IV trend.
    iv_trend_updates: usize = 3;
    /// EMA period in candles.
    ema_period: usize = 20;
    /// ATR period in candles (greek market-type classifier).
    atr_period: usize = 14;
    /// Confirmation and Greek-exit window in seconds.
    confirm_window_seconds: u32 = 30;
    /// IV-crush window in seconds.
    exit_iv_window_seconds: u32 = 60;

    // Bias
    /// Structural bias: minimum delta slope.
    bias_delta_slope: f64 = 0.01;
    /// Structural bias: minimum gamma percent change.
    bias_gamma_change: f64 = 5.0;
    /// Structural bias: votes needed out of six.
    bias_min_conditions: usize = 4;
    /// Baseline bias: votes needed out of four.
    bias_baseline_min_conditions: usize = 3;
    /// Baseline bias: tolerated IV move versus the baseline.
    bias_iv_tolerance: f64 = 0.5;

    // Market type
    /// Candles considered by the candle market-type classifier.
    market_type_window_size: usize = 3;
    /// ATR below this is a neutral market.
    atr_neutral_max: f64 = 10.0;
    /// Lower ATR bound of a trending market.
    atr_trendy_min: f64 = 10.0;
    /// Upper ATR bound of a trending market; above it is volatile.
    atr_trendy_max: f64 = 18.0;
    /// Minimum body ratio of a trending candle.
    body_trendy_min: f64 = 0.6;
    /// Body ratio below this is indecisive.
    body_neutral_max: f64 = 0.3;

    // Entry
    /// Breakout distance beyond the swing, percent.
    breakout_min_percent: f64 = 0.15;
    /// Minimum body ratio of a breakout candle.
    breakout_body_min: f64 = 0.6;
    /// Reversal proximity to the swing extreme, percent.
    reversal_proximity_percent: f64 = 0.1;
    /// Maximum body ratio of a rejection candle.
    reversal_body_max: f64 = 0.3;
    /// Points beyond the swing a close must reach to break structure.
    bos_buffer_points: f64 = 10.0;
    /// Minimum retracement of the impulse for a valid retest, percent.
    retest_min_percent: f64 = 30.0;
    /// Maximum retracement of the impulse for a valid retest, percent.
    retest_max_percent: f64 = 60.0;

    // Confirmation: breakout family
    /// Breakout confirmation: delta slope.
    confirm_delta_slope: f64 = 0.02;
    /// Breakout confirmation: gamma percent change.
    confirm_gamma_change: f64 = 8.0;
    /// Breakout confirmation: IV change.
    confirm_iv_trend: f64 = 1.0;
    /// Breakout confirmation: conditions required.
    confirm_conditions_met: usize = 2;

    // Confirmation: continuation family
    /// Continuation confirmation: delta slope.
    entry_delta_slope_thresh: f64 = 0.01;
    /// Continuation confirmation: gamma percent change.
    entry_gamma_change_thresh: f64 = 5.0;
    /// Continuation confirmation: IV change.
    entry_iv_trend_thresh: f64 = 0.5;
    /// Continuation confirmation: largest tolerated theta percent move.
    entry_theta_max_spike: f64 = 5.0;
    /// Continuation confirmation: conditions required.
    entry_conditions_met: usize = 3;

    // Confirmation: reversal family
    /// Reversal confirmation: delta slope.
    reversal_delta_slope: f64 = 0.015;
    /// Reversal confirmation: gamma percent change.
    reversal_gamma_change: f64 = 10.0;
    /// Reversal confirmation: IV change.
    reversal_iv_trend: f64 = 0.0;
    /// Reversal confirmation: conditions required.
    reversal_conditions_met: usize = 2;

    // Exit
    /// Delta slope against the trade that forces an exit.
    exit_delta_reversal: f64 = 0.02;
    /// Gamma percent change at or below which the trade is exited.
    exit_gamma_drop_thresh: f64 = -15.0;
    /// Long-window IV change at or below which the trade is exited.
    exit_iv_crush_thresh: f64 = -2.0;
}

impl Settings {
    /// Parse a raw settings map. Missing keys keep their defaults.
    pub fn from_map(raw: &HashMap<String, String>) -> Result<Self, SettingsError> {
        Self::from_pairs(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            settings.apply(key, value)?;
        }
        Ok(settings)
    }

    /// Check a single key/value pair against the schema.
    pub fn validate(key: &str, value: &str) -> Result<(), SettingsError> {
        Self::default().apply(key, value)
    }

    pub fn feature_params(&self) -> FeatureParams {
        FeatureParams {
            feature_window: self.feature_window_updates,
            iv_trend_window: self.iv_trend_updates,
            ema_period: self.ema_period,
            atr_period: self.atr_period,
            market_type_window: self.market_type_window_size,
        }
    }

    pub fn confirm_window(&self) -> Window {
        Window::Seconds(self.confirm_window_seconds)
    }

    pub fn exit_iv_window(&self) -> Window {
        Window::Seconds(self.exit_iv_window_seconds)
    }
}

/// Default settings in string form, as a settings store is seeded.
pub fn default_map() -> BTreeMap<String, String> {
    Settings::default().to_map()
}

pub fn spec(key: &str) -> Option<&'static SettingSpec> {
    SCHEMA.iter().find(|s| s.key == key)
}
