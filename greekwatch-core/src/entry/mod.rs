//! Entry engine: layered setup detection.
//!
//! Layer 1: a Neutral bias produces nothing and resets any price-action state.
//! Layer 2: only Trendy or Volatile markets proceed.
//! Layer 3: the configured detector looks for structure in the direction of
//! the bias.
//!
//! At most one detection is returned per evaluation. Whether it becomes a
//! candidate is decided by the session (one active candidate at a time).

pub mod bos_retest;
pub mod structure;

pub use bos_retest::{BosRetestDetector, BreakoutRecord, PriceActionState};
pub use structure::StructureDetector;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::{Bias, Direction, MarketType, SetupKind};
use crate::features::FeatureSet;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy)]
pub struct EntryInput<'a> {
    pub features: &'a FeatureSet,
    pub bias: Bias,
    pub market_type: MarketType,
}

impl EntryInput<'_> {
    /// Trade direction implied by the bias, `None` when neutral.
    pub fn direction(&self) -> Option<Direction> {
        match self.bias {
            Bias::Bullish => Some(Direction::Bullish),
            Bias::Bearish => Some(Direction::Bearish),
            Bias::Neutral => None,
        }
    }
}

/// A setup found by a detector, before it becomes a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub kind: SetupKind,
    /// Underlying price at detection.
    pub price: f64,
}

pub trait EntryDetector: Send + Sync {
    fn name(&self) -> &str;

    /// Look for a setup. Only called once both gates have passed.
    fn detect(&self, input: &EntryInput<'_>, state: &mut PriceActionState) -> Option<Detection>;
}

/// Run the gates, then the detector.
pub fn evaluate_entry(
    detector: &dyn EntryDetector,
    input: &EntryInput<'_>,
    state: &mut PriceActionState,
) -> Option<Detection> {
    if input.bias == Bias::Neutral {
        state.reset();
        return None;
    }
    if !input.market_type.is_tradeable() {
        return None;
    }
    detector.detect(input, state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStrategyKind {
    Structure,
    BosRetest,
}

impl fmt::Display for EntryStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStrategyKind::Structure => f.write_str("structure"),
            EntryStrategyKind::BosRetest => f.write_str("bos_retest"),
        }
    }
}

impl FromStr for EntryStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "structure" => Ok(Self::Structure),
            "bos_retest" => Ok(Self::BosRetest),
            other => Err(format!("unknown entry strategy: {other}")),
        }
    }
}

/// Build the entry detector selected by settings.
pub fn create_detector(settings: &Settings) -> Box<dyn EntryDetector> {
    match settings.entry_strategy {
        EntryStrategyKind::Structure => Box::new(StructureDetector::from_settings(settings)),
        EntryStrategyKind::BosRetest => Box::new(BosRetestDetector::from_settings(settings)),
    }
}
