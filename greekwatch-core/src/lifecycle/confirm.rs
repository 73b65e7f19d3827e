//! Greek confirmation of pending candidates.
//!
//! Each setup family has its own thresholds and required vote count:
//! - Breakout (and immediate BOS): delta slope, gamma expansion, IV rise
//! - Continuation (and retest): the same three plus a theta spike guard
//! - Reversal: delta slope, gamma expansion, IV rise with reversal bounds
//!
//! Bullish setups need delta slope ≥ t, bearish ≤ -t. Gamma and IV tests do
//! not depend on direction.
//!
//! On approval the entry is the signal premium and
//! stop = entry - entry × risk% / 100, target = entry + (entry - stop) × rr.

use serde::Serialize;

use crate::domain::{CandidateSetup, CandidateStatus, Direction, SetupFamily};
use crate::features::GreekSignals;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmationThresholds {
    pub delta_slope: f64,
    pub gamma_change: f64,
    pub iv_change: f64,
    /// Largest tolerated |theta % change|; only the continuation family uses it.
    pub theta_max_spike: Option<f64>,
    pub min_conditions: usize,
}

impl ConfirmationThresholds {
    pub fn for_family(s: &Settings, family: SetupFamily) -> Self {
        match family {
            SetupFamily::Breakout => Self {
                delta_slope: s.confirm_delta_slope,
                gamma_change: s.confirm_gamma_change,
                iv_change: s.confirm_iv_trend,
                theta_max_spike: None,
                min_conditions: s.confirm_conditions_met,
            },
            SetupFamily::Continuation => Self {
                delta_slope: s.entry_delta_slope_thresh,
                gamma_change: s.entry_gamma_change_thresh,
                iv_change: s.entry_iv_trend_thresh,
                theta_max_spike: Some(s.entry_theta_max_spike),
                min_conditions: s.entry_conditions_met,
            },
            SetupFamily::Reversal => Self {
                delta_slope: s.reversal_delta_slope,
                gamma_change: s.reversal_gamma_change,
                iv_change: s.reversal_iv_trend,
                theta_max_spike: None,
                min_conditions: s.reversal_conditions_met,
            },
        }
    }
}

/// Outcome of one confirmation vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfirmationCheck {
    pub met: usize,
    pub required: usize,
}

impl ConfirmationCheck {
    pub fn approved(&self) -> bool {
        self.met >= self.required
    }
}

pub fn evaluate_confirmation(
    direction: Direction,
    signals: &GreekSignals,
    th: &ConfirmationThresholds,
) -> ConfirmationCheck {
    let delta_ok = match direction {
        Direction::Bullish => signals.delta_slope >= th.delta_slope,
        Direction::Bearish => signals.delta_slope <= -th.delta_slope,
    };
    let mut conditions = vec![
        delta_ok,
        signals.gamma_change >= th.gamma_change,
        signals.iv_change >= th.iv_change,
    ];
    if let Some(spike) = th.theta_max_spike {
        conditions.push(signals.theta_change.abs() <= spike);
    }
    ConfirmationCheck {
        met: conditions.into_iter().filter(|c| *c).count(),
        required: th.min_conditions,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Stop-loss and target for an entry premium, rounded to two decimals.
pub fn stop_and_target(entry: f64, risk_percent: f64, risk_reward_ratio: f64) -> (f64, f64) {
    let stop_points = entry * risk_percent / 100.0;
    (
        round2(entry - stop_points),
        round2(entry + stop_points * risk_reward_ratio),
    )
}

/// Approve a pending candidate in place when enough conditions hold.
///
/// Returns the vote; a candidate that is not pending is left untouched and
/// reported as `None`.
pub fn confirm_candidate(
    candidate: &mut CandidateSetup,
    signals: &GreekSignals,
    settings: &Settings,
) -> Option<ConfirmationCheck> {
    if !candidate.is_pending() {
        return None;
    }
    let th = ConfirmationThresholds::for_family(settings, candidate.kind.pattern.family());
    let check = evaluate_confirmation(candidate.direction(), signals, &th);
    if check.approved() {
        let (stop, target) = stop_and_target(
            candidate.signal_premium,
            settings.risk_percent,
            settings.risk_reward_ratio,
        );
        candidate.status = CandidateStatus::EntryApproved;
        candidate.stop_loss = Some(stop);
        candidate.target = Some(target);
    }
    Some(check)
}
