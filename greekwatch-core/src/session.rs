//! Per-session orchestration.
//!
//! A [`Session`] owns every piece of mutable state for one identity: metric
//! and candle buffers, regime labels, the single active candidate, the
//! cooldown deadline, the baseline and the price-action state. The periodic
//! runner drives it through four steps, each receiving the current time and
//! a freshly parsed settings snapshot:
//!
//! 1. [`Session::ingest`] every sampling interval
//! 2. [`Session::aggregate_candle`] every candle period
//! 3. [`Session::evaluate_regime`] every candle period, after aggregation
//! 4. [`Session::confirm_or_exit`] every sampling interval, after ingestion
//!
//! Steps 1–3 are no-ops outside market hours; step 4 drops any candidate it
//! finds outside market hours.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::buffers::{
    CandleBuffer, MetricBuffers, DEFAULT_CANDLE_CAPACITY, DEFAULT_SAMPLE_CAPACITY,
};
use crate::domain::{
    BaselineSnapshot, Bias, Candle, CandidateSetup, CandidateStatus, LogId, MarketSnapshot,
    MarketType, SessionId, SetupKind,
};
use crate::entry::{create_detector, evaluate_entry, EntryInput, PriceActionState};
use crate::features::{FeatureSet, GreekSignals};
use crate::journal::{NewSignalRecord, RecordUpdate, SignalSink};
use crate::lifecycle::{
    check_exit, confirm_candidate, ConfirmationCheck, Cooldown, ExitNotice, ExitThresholds,
};
use crate::market_hours::MarketHours;
use crate::regime::{create_bias, create_market_type, RegimeInput};
use crate::settings::Settings;

/// Result written to the journal when a candidate is dropped at the bell.
pub const CLEARED_OUTSIDE_HOURS: &str = "Cleared outside market hours";

/// Collaborators for one step.
#[derive(Clone, Copy)]
pub struct CycleContext<'a> {
    pub settings: &'a Settings,
    pub hours: &'a MarketHours,
    pub sink: &'a dyn SignalSink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// Another candidate is pending or approved.
    ActiveCandidate,
    /// No positive option premium to reference.
    NoPremium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EntryOutcome {
    None,
    Created(CandidateSetup),
    Dropped { kind: SetupKind, reason: DropReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StepOutcome {
    MarketClosed,
    CoolingDown { until: Option<NaiveDateTime> },
    Ingested { baseline_captured: bool },
    CandleAppended(Candle),
    CandleSkipped,
    Regime {
        bias: Bias,
        market_type: MarketType,
        entry: EntryOutcome,
    },
    Idle,
    ClearedOutsideHours(SetupKind),
    AwaitingConfirmation(ConfirmationCheck),
    Approved(CandidateSetup),
    Holding,
    Exited(ExitNotice),
}

/// What a step did, plus any journal failure it swallowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub outcome: StepOutcome,
    pub journal_error: Option<String>,
}

impl From<StepOutcome> for StepReport {
    fn from(outcome: StepOutcome) -> Self {
        Self {
            outcome,
            journal_error: None,
        }
    }
}

/// Client-facing view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub bias: Bias,
    pub market_type: MarketType,
    pub candidate: Option<CandidateSetup>,
    pub cooldown_until: Option<NaiveDateTime>,
    pub baseline: Option<BaselineSnapshot>,
    pub latest_price: Option<f64>,
    pub latest_premium: Option<f64>,
    pub candles: usize,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub started_at: NaiveDateTime,
    pub buffers: MetricBuffers,
    pub candles: CandleBuffer,
    pub bias: Bias,
    pub market_type: MarketType,
    pub candidate: Option<CandidateSetup>,
    pub cooldown: Cooldown,
    pub baseline: Option<BaselineSnapshot>,
    pub price_action: PriceActionState,
    pub exit_notice: Option<ExitNotice>,
    pub strike: Option<f64>,
}

fn journal_update(sink: &dyn SignalSink, id: Option<LogId>, update: &RecordUpdate) -> Option<String> {
    let id = id?;
    sink.update(id, update).err().map(|e| e.to_string())
}

impl Session {
    pub fn new(id: SessionId, started_at: NaiveDateTime) -> Self {
        Self::with_capacity(id, started_at, DEFAULT_SAMPLE_CAPACITY, DEFAULT_CANDLE_CAPACITY)
    }

    pub fn with_capacity(
        id: SessionId,
        started_at: NaiveDateTime,
        sample_capacity: usize,
        candle_capacity: usize,
    ) -> Self {
        Self {
            id,
            started_at,
            buffers: MetricBuffers::new(sample_capacity),
            candles: CandleBuffer::new(candle_capacity),
            bias: Bias::Neutral,
            market_type: MarketType::Undetermined,
            candidate: None,
            cooldown: Cooldown::default(),
            baseline: None,
            price_action: PriceActionState::default(),
            exit_notice: None,
            strike: None,
        }
    }

    /// Append one market snapshot and capture the baseline once it is due.
    pub fn ingest(
        &mut self,
        snapshot: &MarketSnapshot,
        now: NaiveDateTime,
        ctx: &CycleContext<'_>,
    ) -> StepReport {
        if !ctx.hours.is_open(now) {
            return StepOutcome::MarketClosed.into();
        }
        match self.held_strike() {
            Some(held) if snapshot.strike != Some(held) => self.buffers.push_underlying(snapshot),
            _ => {
                self.buffers.push(snapshot);
                self.strike = snapshot.strike;
            }
        }

        let delay = Duration::minutes(i64::from(ctx.settings.baseline_delay_minutes));
        let due = now >= self.started_at + delay;
        let mut baseline_captured = false;
        if self.baseline.is_none() && due {
            if let Some(b) = BaselineSnapshot::from_snapshot(snapshot) {
                self.baseline = Some(b);
                baseline_captured = true;
            }
        }
        StepOutcome::Ingested { baseline_captured }.into()
    }

    /// Fold the last candle period of price samples into a candle.
    pub fn aggregate_candle(&mut self, now: NaiveDateTime, ctx: &CycleContext<'_>) -> StepReport {
        if !ctx.hours.is_open(now) {
            return StepOutcome::MarketClosed.into();
        }
        match self.buffers.aggregate_candle(now) {
            Some(candle) => {
                self.candles.push(candle);
                StepOutcome::CandleAppended(candle).into()
            }
            None => StepOutcome::CandleSkipped.into(),
        }
    }

    /// Classify bias and market type, then look for a new setup.
    pub fn evaluate_regime(&mut self, now: NaiveDateTime, ctx: &CycleContext<'_>) -> StepReport {
        if !ctx.hours.is_open(now) {
            return StepOutcome::MarketClosed.into();
        }
        if self.cooldown.is_active(now) {
            self.bias = Bias::Neutral;
            self.market_type = MarketType::Undetermined;
            self.price_action.reset();
            return StepOutcome::CoolingDown {
                until: self.cooldown.until(),
            }
            .into();
        }
        self.cooldown.expire(now);

        let settings = ctx.settings;
        let candles = self.candles.to_vec();
        let features = FeatureSet::compute(&self.buffers, &candles, &settings.feature_params());
        let regime_input = RegimeInput {
            features: &features,
            baseline: self.baseline.as_ref(),
        };
        self.bias = create_bias(settings).classify(&regime_input);
        self.market_type = create_market_type(settings).classify(&regime_input);

        let detector = create_detector(settings);
        let detection = evaluate_entry(
            detector.as_ref(),
            &EntryInput {
                features: &features,
                bias: self.bias,
                market_type: self.market_type,
            },
            &mut self.price_action,
        );

        let mut journal_error = None;
        let entry = match detection {
            None => EntryOutcome::None,
            Some(d) if self.candidate.is_some() => EntryOutcome::Dropped {
                kind: d.kind,
                reason: DropReason::ActiveCandidate,
            },
            Some(d) => match features.latest_premium.filter(|p| *p > 0.0) {
                None => EntryOutcome::Dropped {
                    kind: d.kind,
                    reason: DropReason::NoPremium,
                },
                Some(premium) => {
                    let mut candidate =
                        CandidateSetup::new(d.kind, now, d.price, premium, self.strike);
                    let record = NewSignalRecord {
                        timestamp: now,
                        signal_type: d.kind.to_string(),
                        status: candidate.status,
                        strike: candidate.strike,
                        detection_price: d.price,
                        signal_premium: premium,
                    };
                    match ctx.sink.record(record) {
                        Ok(id) => candidate.log_id = Some(id),
                        Err(e) => journal_error = Some(e.to_string()),
                    }
                    self.candidate = Some(candidate.clone());
                    EntryOutcome::Created(candidate)
                }
            },
        };

        StepReport {
            outcome: StepOutcome::Regime {
                bias: self.bias,
                market_type: self.market_type,
                entry,
            },
            journal_error,
        }
    }

    /// Confirm a pending candidate or monitor an approved one for exit.
    pub fn confirm_or_exit(&mut self, now: NaiveDateTime, ctx: &CycleContext<'_>) -> StepReport {
        let settings = ctx.settings;

        if !ctx.hours.is_open(now) {
            let Some(stale) = self.candidate.take() else {
                return StepOutcome::MarketClosed.into();
            };
            let update = RecordUpdate {
                status: Some(CandidateStatus::Closed),
                result: Some(CLEARED_OUTSIDE_HOURS.to_string()),
                ..RecordUpdate::default()
            };
            return StepReport {
                outcome: StepOutcome::ClearedOutsideHours(stale.kind),
                journal_error: journal_update(ctx.sink, stale.log_id, &update),
            };
        }

        if self.cooldown.is_active(now) {
            return StepOutcome::CoolingDown {
                until: self.cooldown.until(),
            }
            .into();
        }
        self.cooldown.expire(now);

        let Some(candidate) = self.candidate.as_mut() else {
            return StepOutcome::Idle.into();
        };
        let signals =
            GreekSignals::compute(&self.buffers, settings.confirm_window(), settings.exit_iv_window());

        if candidate.is_pending() {
            let Some(check) = confirm_candidate(candidate, &signals, settings) else {
                return StepOutcome::Idle.into();
            };
            if !check.approved() {
                return StepOutcome::AwaitingConfirmation(check).into();
            }
            let (stop, target) = (
                candidate.stop_loss.unwrap_or_default(),
                candidate.target.unwrap_or_default(),
            );
            let update = RecordUpdate {
                status: Some(CandidateStatus::EntryApproved),
                entry_price: Some(candidate.signal_premium),
                stop_loss: Some(stop),
                target: Some(target),
                result: Some(format!("SL: {stop:.2}, TGT: {target:.2}")),
                ..RecordUpdate::default()
            };
            return StepReport {
                outcome: StepOutcome::Approved(candidate.clone()),
                journal_error: journal_update(ctx.sink, candidate.log_id, &update),
            };
        }

        let premium = self.buffers.premium.latest_value();
        let thresholds = ExitThresholds::new(settings, ctx.hours);
        let Some(reason) = check_exit(candidate, premium, &signals, now, &thresholds) else {
            return StepOutcome::Holding.into();
        };

        let notice = ExitNotice {
            kind: candidate.kind,
            reason,
            exit_premium: premium,
            at: now,
        };
        let update = RecordUpdate {
            status: Some(CandidateStatus::Closed),
            exit_price: premium,
            result: Some(reason.to_string()),
            ..RecordUpdate::default()
        };
        let journal_error = journal_update(ctx.sink, candidate.log_id, &update);

        self.candidate = None;
        self.price_action.reset();
        self.cooldown.start(now, settings.cooldown_minutes);
        self.exit_notice = Some(notice.clone());
        StepReport {
            outcome: StepOutcome::Exited(notice),
            journal_error,
        }
    }

    /// Strike of the open candidate. While set, option metrics are only
    /// taken from quotes of this strike.
    pub fn held_strike(&self) -> Option<f64> {
        self.candidate.as_ref().and_then(|c| c.strike)
    }

    /// The most recent exit, handed out once.
    pub fn take_exit_notice(&mut self) -> Option<ExitNotice> {
        self.exit_notice.take()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id.clone(),
            bias: self.bias,
            market_type: self.market_type,
            candidate: self.candidate.clone(),
            cooldown_until: self.cooldown.until(),
            baseline: self.baseline,
            latest_price: self.buffers.price.latest_value(),
            latest_premium: self.buffers.premium.latest_value(),
            candles: self.candles.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Greeks, SetupPattern};
    use crate::entry::{BreakoutRecord, EntryStrategyKind};
    use crate::journal::MemoryJournal;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn snapshot(ts: NaiveDateTime, price: f64, premium: f64) -> MarketSnapshot {
        MarketSnapshot {
            timestamp: ts,
            underlying_price: price,
            strike: Some(22_100.0),
            premium: Some(premium),
            greeks: Greeks {
                delta: Some(0.35),
                gamma: Some(0.002),
                theta: Some(-6.0),
                iv: Some(14.0),
            },
        }
    }

    fn approved(premium: f64) -> CandidateSetup {
        let mut c = CandidateSetup::new(
            SetupKind::new(SetupPattern::Breakout, Direction::Bullish),
            at(10, 0, 0),
            22_000.0,
            premium,
            Some(22_100.0),
        );
        c.status = CandidateStatus::EntryApproved;
        c.stop_loss = Some(premium * 0.99);
        c.target = Some(premium * 1.02);
        c
    }

    #[test]
    fn ingest_is_noop_outside_hours() {
        let settings = Settings::default();
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(8, 0, 0));
        let r = s.ingest(&snapshot(at(8, 30, 0), 22_000.0, 80.0), at(8, 30, 0), &ctx);
        assert_eq!(r.outcome, StepOutcome::MarketClosed);
        assert!(s.buffers.price.is_empty());
    }

    #[test]
    fn baseline_captured_once_after_delay() {
        let settings = Settings::default();
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        s.ingest(&snapshot(at(9, 29, 50), 22_000.0, 80.0), at(9, 29, 50), &ctx);
        assert!(s.baseline.is_none());

        let r = s.ingest(&snapshot(at(9, 30, 0), 22_010.0, 80.0), at(9, 30, 0), &ctx);
        assert_eq!(r.outcome, StepOutcome::Ingested { baseline_captured: true });
        s.ingest(&snapshot(at(9, 30, 10), 22_500.0, 90.0), at(9, 30, 10), &ctx);
        assert_eq!(s.baseline.unwrap().price, 22_010.0);
    }

    #[test]
    fn exit_sets_cooldown_and_notice_once() {
        let settings = Settings::default();
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        s.candidate = Some(approved(100.0));
        s.ingest(&snapshot(at(10, 0, 0), 22_000.0, 98.0), at(10, 0, 0), &ctx);

        let r = s.confirm_or_exit(at(10, 0, 5), &ctx);
        assert!(matches!(r.outcome, StepOutcome::Exited(ref n) if n.reason.to_string() == "StopLoss Hit"));
        assert!(s.candidate.is_none());
        assert_eq!(s.cooldown.until(), Some(at(10, 15, 5)));
        assert!(s.take_exit_notice().is_some());
        assert!(s.take_exit_notice().is_none());
    }

    #[test]
    fn candidate_cleared_outside_hours() {
        let settings = Settings::default();
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        s.candidate = Some(approved(100.0));
        let r = s.confirm_or_exit(at(15, 31, 0), &ctx);
        assert!(matches!(r.outcome, StepOutcome::ClearedOutsideHours(_)));
        assert!(s.candidate.is_none());
        assert_eq!(s.confirm_or_exit(at(15, 31, 10), &ctx).outcome, StepOutcome::MarketClosed);
    }

    fn at_strike(ts: NaiveDateTime, strike: f64, premium: f64) -> MarketSnapshot {
        MarketSnapshot {
            strike: Some(strike),
            ..snapshot(ts, 22_000.0, premium)
        }
    }

    #[test]
    fn quotes_of_another_strike_never_close_the_trade() {
        let settings = Settings::default();
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        s.candidate = Some(approved(100.0));
        s.strike = Some(22_100.0);

        // Selection rolled to 22_150, far below the 99 stop of the held contract.
        s.ingest(&at_strike(at(10, 0, 0), 22_150.0, 60.0), at(10, 0, 0), &ctx);
        assert_eq!(s.strike, Some(22_100.0));
        assert_eq!(s.buffers.premium.latest_value(), None);
        assert_eq!(s.buffers.price.latest_value(), Some(22_000.0));
        assert_eq!(s.confirm_or_exit(at(10, 0, 5), &ctx).outcome, StepOutcome::Holding);
        assert!(s.candidate.is_some());

        s.ingest(&at_strike(at(10, 0, 10), 22_100.0, 98.0), at(10, 0, 10), &ctx);
        let r = s.confirm_or_exit(at(10, 0, 15), &ctx);
        assert!(matches!(r.outcome, StepOutcome::Exited(ref n) if n.exit_premium == Some(98.0)));
    }

    #[test]
    fn any_strike_is_followed_without_a_candidate() {
        let settings = Settings::default();
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        s.ingest(&at_strike(at(10, 0, 0), 22_100.0, 80.0), at(10, 0, 0), &ctx);
        s.ingest(&at_strike(at(10, 0, 10), 22_150.0, 60.0), at(10, 0, 10), &ctx);
        assert_eq!(s.strike, Some(22_150.0));
        assert_eq!(s.held_strike(), None);
        assert_eq!(s.buffers.premium.latest_value(), Some(60.0));
    }

    fn pending_retest() -> PriceActionState {
        PriceActionState::LookingForRetest(BreakoutRecord {
            direction: Direction::Bullish,
            level: 22_000.0,
            extreme: 22_100.0,
            candle_time: at(9, 55, 0),
        })
    }

    #[test]
    fn cooldown_discards_recorded_breakout() {
        let mut settings = Settings::default();
        settings.entry_strategy = EntryStrategyKind::BosRetest;
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        s.price_action = pending_retest();
        s.cooldown.start(at(10, 0, 0), 15);

        let r = s.evaluate_regime(at(10, 5, 10), &ctx);
        assert!(matches!(r.outcome, StepOutcome::CoolingDown { .. }));
        assert_eq!(s.bias, Bias::Neutral);
        assert_eq!(s.price_action, PriceActionState::LookingForBos);
    }

    #[test]
    fn exit_discards_recorded_breakout() {
        let mut settings = Settings::default();
        settings.entry_strategy = EntryStrategyKind::BosRetest;
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        s.candidate = Some(approved(100.0));
        s.price_action = pending_retest();
        s.ingest(&snapshot(at(10, 0, 0), 22_000.0, 98.0), at(10, 0, 0), &ctx);

        let r = s.confirm_or_exit(at(10, 0, 5), &ctx);
        assert!(matches!(r.outcome, StepOutcome::Exited(_)));
        assert_eq!(s.price_action, PriceActionState::LookingForBos);
    }

    #[test]
    fn no_candidate_is_idle() {
        let settings = Settings::default();
        let hours = MarketHours::default();
        let sink = MemoryJournal::new();
        let ctx = CycleContext {
            settings: &settings,
            hours: &hours,
            sink: &sink,
        };
        let mut s = Session::new(SessionId::new("u"), at(9, 15, 0));
        assert_eq!(s.confirm_or_exit(at(10, 0, 0), &ctx).outcome, StepOutcome::Idle);
    }
}
