//! Exit monitoring for approved candidates.
//!
//! Checked in order, first match wins:
//! 1. premium ≤ stop-loss
//! 2. premium ≥ target
//! 3. delta slope against the trade beyond `exit_delta_reversal`
//! 4. gamma % change ≤ `exit_gamma_drop_thresh`
//! 5. long-window IV change ≤ `exit_iv_crush_thresh`
//! 6. time of day at or after market close - `eod_exit_minutes`

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{CandidateSetup, Direction, SetupKind};
use crate::features::GreekSignals;
use crate::market_hours::MarketHours;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    Target,
    DeltaReversal,
    GammaDrop,
    IvCrush,
    EndOfDay,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "StopLoss Hit",
            ExitReason::Target => "Target Hit",
            ExitReason::DeltaReversal => "Greek Exit: Delta Reversal",
            ExitReason::GammaDrop => "Greek Exit: Gamma Drop",
            ExitReason::IvCrush => "Emergency Exit: IV Crush",
            ExitReason::EndOfDay => "Time-based Exit (EOD)",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitThresholds {
    pub delta_reversal: f64,
    pub gamma_drop: f64,
    pub iv_crush: f64,
    pub eod_cutoff: NaiveTime,
}

impl ExitThresholds {
    pub fn new(s: &Settings, hours: &MarketHours) -> Self {
        Self {
            delta_reversal: s.exit_delta_reversal,
            gamma_drop: s.exit_gamma_drop_thresh,
            iv_crush: s.exit_iv_crush_thresh,
            eod_cutoff: hours.eod_cutoff(s.eod_exit_minutes),
        }
    }
}

/// Why an approved candidate should be closed, if at all.
///
/// Price checks are skipped when no premium sample is available.
pub fn check_exit(
    candidate: &CandidateSetup,
    premium: Option<f64>,
    signals: &GreekSignals,
    now: NaiveDateTime,
    th: &ExitThresholds,
) -> Option<ExitReason> {
    if !candidate.is_approved() {
        return None;
    }
    if let Some(p) = premium {
        if candidate.stop_loss.is_some_and(|sl| p <= sl) {
            return Some(ExitReason::StopLoss);
        }
        if candidate.target.is_some_and(|t| p >= t) {
            return Some(ExitReason::Target);
        }
    }
    let reversed = match candidate.direction() {
        Direction::Bullish => signals.delta_slope <= -th.delta_reversal,
        Direction::Bearish => signals.delta_slope >= th.delta_reversal,
    };
    if reversed {
        return Some(ExitReason::DeltaReversal);
    }
    if signals.gamma_change <= th.gamma_drop {
        return Some(ExitReason::GammaDrop);
    }
    if signals.iv_change_long <= th.iv_crush {
        return Some(ExitReason::IvCrush);
    }
    if now.time() >= th.eod_cutoff {
        return Some(ExitReason::EndOfDay);
    }
    None
}

/// An exit surfaced to the client exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitNotice {
    pub kind: SetupKind,
    pub reason: ExitReason,
    pub exit_premium: Option<f64>,
    pub at: NaiveDateTime,
}

impl fmt::Display for ExitNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_premium {
            Some(p) => write!(f, "{} ({}) at {p:.2}", self.reason, self.kind),
            None => write!(f, "{} ({})", self.reason, self.kind),
        }
    }
}
