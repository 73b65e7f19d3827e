//! Regime classifiers: directional bias and market type.
//!
//! Each classifier is a strategy trait with interchangeable variants. The
//! variant is chosen per cycle from settings (`bias_strategy`,
//! `market_type_strategy`), so an operator can switch behavior live and
//! each variant is testable on its own.

pub mod bias;
pub mod market_type;

pub use bias::{BaselineBias, StructuralBias};
pub use market_type::{CandleMarketType, GreekMarketType};

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::{BaselineSnapshot, Bias, MarketType};
use crate::features::FeatureSet;
use crate::settings::Settings;

/// Inputs shared by all regime classifiers.
#[derive(Debug, Clone, Copy)]
pub struct RegimeInput<'a> {
    pub features: &'a FeatureSet,
    pub baseline: Option<&'a BaselineSnapshot>,
}

pub trait BiasStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, input: &RegimeInput<'_>) -> Bias;
}

pub trait MarketTypeStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, input: &RegimeInput<'_>) -> MarketType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasStrategyKind {
    Baseline,
    Structural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTypeStrategyKind {
    Candle,
    Greek,
}

impl fmt::Display for BiasStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasStrategyKind::Baseline => f.write_str("baseline"),
            BiasStrategyKind::Structural => f.write_str("structural"),
        }
    }
}

impl FromStr for BiasStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(Self::Baseline),
            "structural" => Ok(Self::Structural),
            other => Err(format!("unknown bias strategy: {other}")),
        }
    }
}

impl fmt::Display for MarketTypeStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketTypeStrategyKind::Candle => f.write_str("candle"),
            MarketTypeStrategyKind::Greek => f.write_str("greek"),
        }
    }
}

impl FromStr for MarketTypeStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candle" => Ok(Self::Candle),
            "greek" => Ok(Self::Greek),
            other => Err(format!("unknown market type strategy: {other}")),
        }
    }
}

/// Build the bias classifier selected by settings.
pub fn create_bias(settings: &Settings) -> Box<dyn BiasStrategy> {
    match settings.bias_strategy {
        BiasStrategyKind::Baseline => Box::new(BaselineBias::from_settings(settings)),
        BiasStrategyKind::Structural => Box::new(StructuralBias::from_settings(settings)),
    }
}

/// Build the market-type classifier selected by settings.
pub fn create_market_type(settings: &Settings) -> Box<dyn MarketTypeStrategy> {
    match settings.market_type_strategy {
        MarketTypeStrategyKind::Candle => Box::new(CandleMarketType::from_settings(settings)),
        MarketTypeStrategyKind::Greek => Box::new(GreekMarketType::from_settings(settings)),
    }
}

/// Number of true conditions in a vote.
pub(crate) fn votes(conditions: &[bool]) -> usize {
    conditions.iter().filter(|c| **c).count()
}
