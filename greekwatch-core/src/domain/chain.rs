//! Option chain and the deterministic strike-selection rule.
//!
//! ATM is the strike closest to the underlying (ties go to the lower strike).
//! The monitored contract is the call `otm_offset` strikes above ATM.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Greeks, MarketSnapshot};

#[derive(Debug, Error, PartialEq)]
pub enum ChainError {
    #[error("option chain is empty")]
    Empty,
    #[error("no strike {offset} above ATM (ATM index {atm_index}, {len} strikes)")]
    OffsetOutOfRange {
        atm_index: usize,
        offset: usize,
        len: usize,
    },
}

/// Quote for one side (call) of a strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub ltp: Option<f64>,
    pub greeks: Greeks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRow {
    pub strike: f64,
    pub call: Option<OptionQuote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    pub timestamp: NaiveDateTime,
    pub underlying_price: f64,
    pub rows: Vec<ChainRow>,
}

impl OptionChain {
    /// Index of the ATM row within `rows` sorted by strike.
    fn atm_index(sorted: &[&ChainRow], underlying: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, row) in sorted.iter().enumerate() {
            let dist = (row.strike - underlying).abs();
            match best {
                Some((_, d)) if dist >= d => {}
                _ => best = Some((i, dist)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Select the monitored strike and flatten it into a snapshot.
    ///
    /// A strike without a call quote still yields a snapshot; its premium and
    /// Greeks are simply absent.
    pub fn select_strike(&self, otm_offset: usize) -> Result<MarketSnapshot, ChainError> {
        let mut sorted: Vec<&ChainRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        let atm_index =
            Self::atm_index(&sorted, self.underlying_price).ok_or(ChainError::Empty)?;
        let row = sorted
            .get(atm_index + otm_offset)
            .ok_or(ChainError::OffsetOutOfRange {
                atm_index,
                offset: otm_offset,
                len: sorted.len(),
            })?;

        Ok(self.snapshot_of(row))
    }

    /// Snapshot of one listed strike, used to keep following the contract
    /// an open candidate was detected on. `None` if the strike is not listed.
    pub fn snapshot_at(&self, strike: f64) -> Option<MarketSnapshot> {
        self.rows
            .iter()
            .find(|r| r.strike == strike)
            .map(|r| self.snapshot_of(r))
    }

    fn snapshot_of(&self, row: &ChainRow) -> MarketSnapshot {
        let (premium, greeks) = match row.call {
            Some(q) => (q.ltp, q.greeks),
            None => (None, Greeks::default()),
        };
        MarketSnapshot {
            timestamp: self.timestamp,
            underlying_price: self.underlying_price,
            strike: Some(row.strike),
            premium,
            greeks,
        }
    }
}
