//! Regime labels produced by the classifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketType {
    Trendy,
    Volatile,
    Neutral,
    #[default]
    Undetermined,
}

impl MarketType {
    /// Only trending or volatile markets may produce entries.
    pub fn is_tradeable(self) -> bool {
        matches!(self, MarketType::Trendy | MarketType::Volatile)
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bias::Bullish => "Bullish",
            Bias::Bearish => "Bearish",
            Bias::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketType::Trendy => "Trendy",
            MarketType::Volatile => "Volatile",
            MarketType::Neutral => "Neutral",
            MarketType::Undetermined => "Undetermined",
        };
        f.write_str(s)
    }
}
