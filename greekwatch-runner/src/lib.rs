//! GreekWatch Runner: scheduling, data sources and persistence around the
//! core signal engine.
//!
//! This crate builds on `greekwatch-core` to provide:
//! - TOML runner configuration
//! - Exchange-local clocks (live and manual)
//! - The shared settings store, re-read every cycle
//! - Session registry with per-session locks
//! - Wall-clock aligned periodic jobs (tokio)
//! - Market data sources: synthetic chain feed and CSV snapshots
//! - JSON-lines signal journal
//! - The live engine and an offline replay driver

pub mod clock;
pub mod config;
pub mod engine;
pub mod feed;
pub mod journal;
pub mod registry;
pub mod replay;
pub mod scheduler;
pub mod settings_store;

pub use clock::{Clock, ExchangeClock, ManualClock};
pub use config::{BufferConfig, ConfigError, JobTiming, RunnerConfig, ScheduleConfig};
pub use engine::{Engine, EngineError, EngineParts};
pub use feed::{load_snapshots_csv, read_snapshots, FeedError, MarketDataSource, SyntheticChainFeed};
pub use journal::JsonlJournal;
pub use registry::SessionRegistry;
pub use replay::{ReplayDriver, ReplayReport};
pub use scheduler::{first_fire_delay, JobDescriptor, JobHandler, JobKind, PeriodicRunner};
pub use settings_store::SettingsStore;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn engine_is_send_sync() {
        assert_send::<Engine>();
        assert_sync::<Engine>();
    }

    #[test]
    fn stores_are_send_sync() {
        assert_send::<SettingsStore>();
        assert_sync::<SettingsStore>();
        assert_send::<SessionRegistry>();
        assert_sync::<SessionRegistry>();
        assert_send::<JsonlJournal>();
        assert_sync::<JsonlJournal>();
    }

    #[test]
    fn feeds_are_send_sync() {
        assert_send::<SyntheticChainFeed>();
        assert_sync::<SyntheticChainFeed>();
        assert_send::<Box<dyn MarketDataSource>>();
    }
}
