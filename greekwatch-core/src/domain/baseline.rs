//! BaselineSnapshot: the zero reference for baseline-relative bias.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::MarketSnapshot;

/// Captured once per session and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub captured_at: NaiveDateTime,
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub iv: f64,
}

impl BaselineSnapshot {
    /// Requires every Greek used by the bias vote to be present.
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Option<Self> {
        Some(Self {
            captured_at: snapshot.timestamp,
            price: snapshot.underlying_price,
            delta: snapshot.greeks.delta?,
            gamma: snapshot.greeks.gamma?,
            iv: snapshot.greeks.iv?,
        })
    }
}
