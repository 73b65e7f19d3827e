//! Candidate setups and their lifecycle status.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::LogId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// +1 for bullish, -1 for bearish.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => f.write_str("Bullish"),
            Direction::Bearish => f.write_str("Bearish"),
        }
    }
}

/// Structural pattern that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupPattern {
    Breakout,
    Continuation,
    Reversal,
    /// Break of structure taken immediately (volatile market).
    Bos,
    /// Break of structure followed by a valid retest (trending market).
    Retest,
}

impl SetupPattern {
    /// Threshold family used when confirming the candidate with Greeks.
    pub fn family(self) -> SetupFamily {
        match self {
            SetupPattern::Breakout | SetupPattern::Bos => SetupFamily::Breakout,
            SetupPattern::Continuation | SetupPattern::Retest => SetupFamily::Continuation,
            SetupPattern::Reversal => SetupFamily::Reversal,
        }
    }
}

impl fmt::Display for SetupPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetupPattern::Breakout => "Breakout",
            SetupPattern::Continuation => "Continuation",
            SetupPattern::Reversal => "Reversal",
            SetupPattern::Bos => "BOS",
            SetupPattern::Retest => "Retest",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupFamily {
    Breakout,
    Continuation,
    Reversal,
}

/// Pattern × direction, rendered as e.g. `Breakout_Bullish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetupKind {
    pub pattern: SetupPattern,
    pub direction: Direction,
}

impl SetupKind {
    pub fn new(pattern: SetupPattern, direction: Direction) -> Self {
        Self { pattern, direction }
    }
}

impl fmt::Display for SetupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.pattern, self.direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateStatus {
    #[serde(rename = "Pending_Greek_Confirmation")]
    PendingGreekConfirmation,
    #[serde(rename = "ENTRY_APPROVED")]
    EntryApproved,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidateStatus::PendingGreekConfirmation => "Pending_Greek_Confirmation",
            CandidateStatus::EntryApproved => "ENTRY_APPROVED",
            CandidateStatus::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// The single active trade opportunity of a session.
///
/// `stop_loss` and `target` are set only once the candidate is approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSetup {
    pub kind: SetupKind,
    pub detected_at: NaiveDateTime,
    /// Underlying price at detection.
    pub price: f64,
    /// Option premium at detection; also the entry price on approval.
    pub signal_premium: f64,
    pub strike: Option<f64>,
    pub status: CandidateStatus,
    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub log_id: Option<LogId>,
}

impl CandidateSetup {
    pub fn new(
        kind: SetupKind,
        detected_at: NaiveDateTime,
        price: f64,
        signal_premium: f64,
        strike: Option<f64>,
    ) -> Self {
        Self {
            kind,
            detected_at,
            price,
            signal_premium,
            strike,
            status: CandidateStatus::PendingGreekConfirmation,
            stop_loss: None,
            target: None,
            log_id: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == CandidateStatus::PendingGreekConfirmation
    }

    pub fn is_approved(&self) -> bool {
        self.status == CandidateStatus::EntryApproved
    }

    pub fn direction(&self) -> Direction {
        self.kind.direction
    }
}
