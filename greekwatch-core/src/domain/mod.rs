//! Domain types for the signal engine.

pub mod baseline;
pub mod candidate;
pub mod candle;
pub mod chain;
pub mod ids;
pub mod regime;
pub mod snapshot;

pub use baseline::BaselineSnapshot;
pub use candidate::{
    CandidateSetup, CandidateStatus, Direction, SetupFamily, SetupKind, SetupPattern,
};
pub use candle::{candle_start, Candle, CANDLE_PERIOD_SECS};
pub use chain::{ChainError, ChainRow, OptionChain, OptionQuote};
pub use ids::{LogId, SessionId};
pub use regime::{Bias, MarketType};
pub use snapshot::{Greeks, MarketSnapshot};
