//! Trading calendar of the exchange.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Session window in exchange-local time. Open is inclusive, close exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub trading_days: Vec<Weekday>,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
            trading_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl MarketHours {
    pub fn is_trading_day(&self, now: NaiveDateTime) -> bool {
        self.trading_days.contains(&now.weekday())
    }

    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        let t = now.time();
        self.is_trading_day(now) && t >= self.open && t < self.close
    }

    /// Time of day from which open trades are closed ahead of the bell.
    /// Clamped to midnight when the lead time reaches past the start of day.
    pub fn eod_cutoff(&self, minutes_before_close: u32) -> NaiveTime {
        let lead = Duration::minutes(i64::from(minutes_before_close));
        match self.close.overflowing_sub_signed(lead) {
            (cutoff, 0) => cutoff,
            _ => NaiveTime::MIN,
        }
    }
}
