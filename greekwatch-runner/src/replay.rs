//! Offline replay of recorded snapshots through one session.
//!
//! Sample timestamps are the clock. Every sample runs ingestion then
//! confirmation/exit; when a sample crosses into a new five-minute candle
//! period, candle aggregation and regime evaluation run as well, in that
//! order, the same sequence the live schedule produces.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use greekwatch_core::domain::{candle_start, CandidateSetup, MarketSnapshot, SessionId};
use greekwatch_core::journal::SignalSink;
use greekwatch_core::lifecycle::ExitNotice;
use greekwatch_core::session::EntryOutcome;
use greekwatch_core::{
    CycleContext, MarketHours, Session, SessionStatus, Settings, StepOutcome, StepReport,
};

use crate::config::BufferConfig;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub samples: usize,
    pub candles: usize,
    pub detections: Vec<CandidateSetup>,
    pub dropped_detections: usize,
    pub approvals: Vec<CandidateSetup>,
    pub exits: Vec<ExitNotice>,
    pub journal_errors: Vec<String>,
    pub final_status: Option<SessionStatus>,
}

impl ReplayReport {
    fn absorb(&mut self, report: StepReport) {
        if let Some(e) = report.journal_error {
            self.journal_errors.push(e);
        }
        match report.outcome {
            StepOutcome::CandleAppended(_) => self.candles += 1,
            StepOutcome::Regime { entry, .. } => match entry {
                EntryOutcome::Created(c) => self.detections.push(c),
                EntryOutcome::Dropped { .. } => self.dropped_detections += 1,
                EntryOutcome::None => {}
            },
            StepOutcome::Approved(c) => self.approvals.push(c),
            StepOutcome::Exited(n) => self.exits.push(n),
            _ => {}
        }
    }
}

pub struct ReplayDriver {
    id: SessionId,
    settings: Settings,
    hours: MarketHours,
    buffers: BufferConfig,
    journal: Arc<dyn SignalSink>,
}

impl ReplayDriver {
    pub fn new(
        id: SessionId,
        settings: Settings,
        hours: MarketHours,
        buffers: BufferConfig,
        journal: Arc<dyn SignalSink>,
    ) -> Self {
        Self {
            id,
            settings,
            hours,
            buffers,
            journal,
        }
    }

    /// Replay `snapshots` (assumed sorted by timestamp). The session starts
    /// at the first sample's timestamp.
    pub fn run(&self, snapshots: &[MarketSnapshot]) -> ReplayReport {
        let mut report = ReplayReport::default();
        let Some(first) = snapshots.first() else {
            return report;
        };
        let mut session = Session::with_capacity(
            self.id.clone(),
            first.timestamp,
            self.buffers.sample_capacity,
            self.buffers.candle_capacity,
        );
        let ctx = CycleContext {
            settings: &self.settings,
            hours: &self.hours,
            sink: self.journal.as_ref(),
        };

        let mut prev: Option<NaiveDateTime> = None;
        for snap in snapshots {
            let now = snap.timestamp;
            report.samples += 1;

            report.absorb(session.ingest(snap, now, &ctx));
            report.absorb(session.confirm_or_exit(now, &ctx));
            if prev.is_some_and(|p| candle_start(p) < candle_start(now)) {
                report.absorb(session.aggregate_candle(now, &ctx));
                report.absorb(session.evaluate_regime(now, &ctx));
            }
            prev = Some(now);
        }
        report.final_status = Some(session.status());
        report
    }
}
