//! GreekWatch Core: the signal engine of an intraday index-options assistant.
//!
//! This crate holds every algorithm and all per-session state:
//! - Domain types (snapshots, option chains, candles, candidates, regimes)
//! - Bounded rolling buffers of metric samples and candles
//! - Feature calculators (slopes, percent changes, stability, EMA, ATR,
//!   swing points, body ratios)
//! - Bias and market-type classifiers behind strategy traits
//! - Layered entry detection (breakout, continuation, reversal, BOS/retest)
//! - The confirmation / exit state machine with cooldown
//! - The settings schema and the signal journal trait
//! - [`session::Session`], which runs the per-session steps
//!
//! Nothing here performs I/O or spawns tasks; the runner crate schedules
//! sessions and supplies market data.

pub mod buffers;
pub mod domain;
pub mod entry;
pub mod features;
pub mod journal;
pub mod lifecycle;
pub mod market_hours;
pub mod regime;
pub mod session;
pub mod settings;

pub use market_hours::MarketHours;
pub use session::{CycleContext, Session, SessionStatus, StepOutcome, StepReport};
pub use settings::{Settings, SettingsError};
