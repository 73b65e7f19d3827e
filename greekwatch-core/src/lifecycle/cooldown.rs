//! Post-exit cooldown.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    until: Option<NaiveDateTime>,
}

impl Cooldown {
    pub fn start(&mut self, now: NaiveDateTime, minutes: u32) {
        self.until = Some(now + Duration::minutes(i64::from(minutes)));
    }

    /// True strictly before the deadline.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.until.is_some_and(|u| now < u)
    }

    /// Clear an elapsed deadline. Returns true if one was cleared.
    pub fn expire(&mut self, now: NaiveDateTime) -> bool {
        match self.until {
            Some(u) if now >= u => {
                self.until = None;
                true
            }
            _ => false,
        }
    }

    pub fn until(&self) -> Option<NaiveDateTime> {
        self.until
    }
}
