//! MarketSnapshot: one sampled tick of the monitored option.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Option sensitivities. Any of them may be missing upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub iv: Option<f64>,
}

/// Underlying price plus premium and Greeks of the monitored strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: NaiveDateTime,
    pub underlying_price: f64,
    pub strike: Option<f64>,
    pub premium: Option<f64>,
    pub greeks: Greeks,
}

impl MarketSnapshot {
    /// Snapshot with only the underlying price (option leg unavailable).
    pub fn price_only(timestamp: NaiveDateTime, underlying_price: f64) -> Self {
        Self {
            timestamp,
            underlying_price,
            strike: None,
            premium: None,
            greeks: Greeks::default(),
        }
    }
}
