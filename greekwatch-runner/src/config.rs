//! Runner configuration, loaded from TOML.
//!
//! Every section is optional; a missing section or key takes the default.
//!
//! ```toml
//! journal_path = "signals.jsonl"
//!
//! [schedule.ingest]
//! period_secs = 10
//! offset_secs = 0
//!
//! [market_hours]
//! open = "09:15:00"
//! close = "15:30:00"
//! trading_days = ["Mon", "Tue", "Wed", "Thu", "Fri"]
//!
//! [exchange]
//! utc_offset_minutes = 330
//!
//! [buffers]
//! sample_capacity = 30
//! candle_capacity = 100
//!
//! [settings]
//! risk_percent = 1.5
//! entry_strategy = "bos_retest"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use greekwatch_core::buffers::{
    DEFAULT_CANDLE_CAPACITY, DEFAULT_SAMPLE_CAPACITY, SAMPLES_PER_CANDLE,
};
use greekwatch_core::settings::SettingsError;
use greekwatch_core::{MarketHours, Settings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid settings override: {0}")]
    Setting(#[from] SettingsError),
}

/// Period and wall-clock offset of one periodic job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTiming {
    pub period_secs: u64,
    #[serde(default)]
    pub offset_secs: u64,
}

impl JobTiming {
    pub const fn new(period_secs: u64, offset_secs: u64) -> Self {
        Self {
            period_secs,
            offset_secs,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn offset(&self) -> Duration {
        Duration::from_secs(self.offset_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub ingest: JobTiming,
    pub confirm: JobTiming,
    pub candle: JobTiming,
    pub regime: JobTiming,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            ingest: JobTiming::new(10, 0),
            confirm: JobTiming::new(10, 5),
            candle: JobTiming::new(300, 5),
            regime: JobTiming::new(300, 10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Exchange-local offset from UTC; 330 is IST.
    pub utc_offset_minutes: i32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
        }
    }
}

impl ExchangeConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub sample_capacity: usize,
    pub candle_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            candle_capacity: DEFAULT_CANDLE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub schedule: ScheduleConfig,
    pub market_hours: MarketHours,
    pub exchange: ExchangeConfig,
    pub buffers: BufferConfig,
    pub journal_path: Option<PathBuf>,
    /// Initial values for the settings store. Numbers and strings are both
    /// accepted and validated against the settings schema.
    pub settings: BTreeMap<String, toml::Value>,
}

impl RunnerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.schedule;
        for (name, timing) in [
            ("ingest", s.ingest),
            ("confirm", s.confirm),
            ("candle", s.candle),
            ("regime", s.regime),
        ] {
            if timing.period_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "schedule.{name}.period_secs must be positive"
                )));
            }
        }
        if self.market_hours.open >= self.market_hours.close {
            return Err(ConfigError::Invalid(format!(
                "market open {} must be before close {}",
                self.market_hours.open, self.market_hours.close
            )));
        }
        if self.buffers.sample_capacity < SAMPLES_PER_CANDLE {
            return Err(ConfigError::Invalid(format!(
                "buffers.sample_capacity {} is below the {SAMPLES_PER_CANDLE} samples a candle needs",
                self.buffers.sample_capacity
            )));
        }
        if self.buffers.candle_capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffers.candle_capacity must be positive".into(),
            ));
        }
        self.exchange.offset()?;
        self.typed_settings()?;
        Ok(())
    }

    /// Settings overrides as raw strings, the form the settings store keeps.
    pub fn settings_overrides(&self) -> Vec<(String, String)> {
        self.settings
            .iter()
            .map(|(k, v)| {
                let raw = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), raw)
            })
            .collect()
    }

    /// Defaults with the overrides applied.
    pub fn typed_settings(&self) -> Result<Settings, ConfigError> {
        let overrides = self.settings_overrides();
        Ok(Settings::from_pairs(
            overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn empty_config_uses_defaults() {
        let c = RunnerConfig::from_toml_str("").unwrap();
        assert_eq!(c.schedule, ScheduleConfig::default());
        assert_eq!(c.market_hours, MarketHours::default());
        assert_eq!(c.exchange.utc_offset_minutes, 330);
        assert_eq!(c.buffers.sample_capacity, 30);
        assert!(c.journal_path.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let c = RunnerConfig::from_toml_str(
            r#"
            journal_path = "out/signals.jsonl"

            [schedule.regime]
            period_secs = 300
            offset_secs = 20

            [market_hours]
            open = "09:00:00"
            close = "15:00:00"
            trading_days = ["Mon", "Wed"]

            [settings]
            risk_percent = 1.5
            cooldown_minutes = 5
            entry_strategy = "bos_retest"
            "#,
        )
        .unwrap();
        assert_eq!(c.schedule.regime, JobTiming::new(300, 20));
        assert_eq!(c.schedule.ingest, JobTiming::new(10, 0));
        assert_eq!(c.market_hours.open, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(c.market_hours.trading_days.len(), 2);
        assert_eq!(c.journal_path, Some(PathBuf::from("out/signals.jsonl")));

        let s = c.typed_settings().unwrap();
        assert_eq!(s.risk_percent, 1.5);
        assert_eq!(s.cooldown_minutes, 5);
        assert_eq!(s.entry_strategy.to_string(), "bos_retest");
    }

    #[test]
    fn zero_period_rejected() {
        let err = RunnerConfig::from_toml_str(
            r#"
            [schedule.ingest]
            period_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("ingest")));
    }

    #[test]
    fn open_after_close_rejected() {
        let err = RunnerConfig::from_toml_str(
            r#"
            [market_hours]
            open = "16:00:00"
            close = "15:30:00"
            trading_days = ["Mon"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn small_sample_buffer_rejected() {
        let err = RunnerConfig::from_toml_str(
            r#"
            [buffers]
            sample_capacity = 10
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("sample_capacity")));
    }

    #[test]
    fn bad_setting_override_rejected() {
        let err = RunnerConfig::from_toml_str(
            r#"
            [settings]
            risk_percent = "lots"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Setting(SettingsError::InvalidValue { .. })));

        let err = RunnerConfig::from_toml_str(
            r#"
            [settings]
            not_a_key = 1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Setting(SettingsError::UnknownKey(_))));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.toml");
        fs::write(&path, "[exchange]\nutc_offset_minutes = 0\n").unwrap();
        let c = RunnerConfig::load(&path).unwrap();
        assert_eq!(c.exchange.utc_offset_minutes, 0);

        let missing = dir.path().join("absent.toml");
        let err = RunnerConfig::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { ref path, .. } if *path == missing));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = RunnerConfig::from_toml_str("[schedule").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
