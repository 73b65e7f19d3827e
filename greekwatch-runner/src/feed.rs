//! Market data sources.
//!
//! [`MarketDataSource`] is the seam to the upstream option-chain API. Two
//! sources ship with the runner:
//! - [`SyntheticChainFeed`]: seeded random walk of the underlying with a
//!   generated strike ladder, for demos and soak tests
//! - [`load_snapshots_csv`]: recorded snapshots for offline replay

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;

use greekwatch_core::domain::{
    ChainRow, Greeks, MarketSnapshot, OptionChain, OptionQuote, SessionId,
};

use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid timestamp {value:?}")]
    Timestamp { row: usize, value: String },
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, session: &SessionId) -> Result<OptionChain, FeedError>;
}

// ── Synthetic feed ───────────────────────────────────────────────────

/// Strike spacing of the generated ladder.
pub const STRIKE_STEP: f64 = 50.0;
/// Strikes generated on each side of ATM.
pub const STRIKES_PER_SIDE: usize = 10;

#[derive(Debug)]
struct WalkState {
    rng: StdRng,
    price: f64,
    iv: f64,
}

/// Deterministic random-walk chain generator. Every session sees the same
/// underlying.
pub struct SyntheticChainFeed {
    clock: Arc<dyn Clock>,
    state: Mutex<WalkState>,
    volatility: f64,
}

impl SyntheticChainFeed {
    pub fn new(clock: Arc<dyn Clock>, seed: u64, start_price: f64) -> Self {
        Self {
            clock,
            state: Mutex::new(WalkState {
                rng: StdRng::seed_from_u64(seed),
                price: start_price,
                iv: 14.0,
            }),
            volatility: 6.0,
        }
    }

    /// Per-step standard deviation of the underlying, in points.
    pub fn with_volatility(mut self, points: f64) -> Self {
        self.volatility = points;
        self
    }

    fn step(&self) -> (f64, f64) {
        let mut s = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let shock: f64 = s.rng.gen_range(-1.0..1.0) + s.rng.gen_range(-1.0..1.0);
        s.price = (s.price + shock * self.volatility).max(1.0);
        let iv_shock: f64 = s.rng.gen_range(-0.1..0.1);
        s.iv = (s.iv + iv_shock).clamp(8.0, 40.0);
        (s.price, s.iv)
    }
}

/// Plausible call quote for a strike: logistic delta, gamma from its
/// derivative, time value decaying away from the money.
fn synthetic_call(underlying: f64, strike: f64, iv: f64) -> OptionQuote {
    let scale = underlying * iv / 100.0 * 0.02;
    let z = (underlying - strike) / scale.max(1.0);
    let delta = 1.0 / (1.0 + (-z).exp());
    let gamma = delta * (1.0 - delta) / scale.max(1.0);
    let intrinsic = (underlying - strike).max(0.0);
    let time_value = scale * 4.0 * (-(underlying - strike).abs() / (scale * 3.0)).exp();
    let premium = ((intrinsic + time_value) * 100.0).round() / 100.0;
    OptionQuote {
        ltp: Some(premium.max(0.05)),
        greeks: Greeks {
            delta: Some(delta),
            gamma: Some(gamma),
            theta: Some(-(time_value * 0.08 + 1.0)),
            iv: Some(iv),
        },
    }
}

pub fn synthetic_chain(timestamp: NaiveDateTime, underlying: f64, iv: f64) -> OptionChain {
    let atm = (underlying / STRIKE_STEP).round() * STRIKE_STEP;
    let side = STRIKES_PER_SIDE as i64;
    let rows = (-side..=side)
        .map(|i| {
            let strike = atm + i as f64 * STRIKE_STEP;
            ChainRow {
                strike,
                call: Some(synthetic_call(underlying, strike, iv)),
            }
        })
        .collect();
    OptionChain {
        timestamp,
        underlying_price: underlying,
        rows,
    }
}

#[async_trait]
impl MarketDataSource for SyntheticChainFeed {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, _session: &SessionId) -> Result<OptionChain, FeedError> {
        let (price, iv) = self.step();
        Ok(synthetic_chain(self.clock.now(), price, iv))
    }
}

// ── CSV snapshots ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    timestamp: String,
    underlying_price: f64,
    strike: Option<f64>,
    premium: Option<f64>,
    delta: Option<f64>,
    gamma: Option<f64>,
    theta: Option<f64>,
    iv: Option<f64>,
}

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Read snapshots with columns `timestamp, underlying_price, strike, premium,
/// delta, gamma, theta, iv`. Empty cells are absent values. Rows are
/// returned in timestamp order.
pub fn read_snapshots<R: Read>(reader: R) -> Result<Vec<MarketSnapshot>, FeedError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for (i, row) in rdr.deserialize::<SnapshotRow>().enumerate() {
        let row = row?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| FeedError::Timestamp {
            row: i + 1,
            value: row.timestamp.clone(),
        })?;
        out.push(MarketSnapshot {
            timestamp,
            underlying_price: row.underlying_price,
            strike: row.strike,
            premium: row.premium,
            greeks: Greeks {
                delta: row.delta,
                gamma: row.gamma,
                theta: row.theta,
                iv: row.iv,
            },
        });
    }
    out.sort_by_key(|s| s.timestamp);
    Ok(out)
}

pub fn load_snapshots_csv(path: &Path) -> Result<Vec<MarketSnapshot>, FeedError> {
    read_snapshots(File::open(path)?)
}
