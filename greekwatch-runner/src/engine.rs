//! Live signal engine.
//!
//! Ties the registry, scheduler, settings store, feed and journal together.
//! `login` creates a session and starts its four jobs; `logout` stops them
//! and discards the state. Every job re-reads the settings store, so edits
//! take effect on the next cycle.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use greekwatch_core::domain::{ChainError, SessionId};
use greekwatch_core::journal::{JournalError, SignalRecord, SignalSink};
use greekwatch_core::lifecycle::ExitNotice;
use greekwatch_core::session::EntryOutcome;
use greekwatch_core::{
    CycleContext, MarketHours, Session, SessionStatus, SettingsError, StepOutcome, StepReport,
};

use crate::clock::Clock;
use crate::config::{BufferConfig, ScheduleConfig};
use crate::feed::{FeedError, MarketDataSource};
use crate::registry::{SessionRegistry, SharedSession};
use crate::scheduler::{session_jobs, JobHandler, JobKind, PeriodicRunner};
use crate::settings_store::SettingsStore;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error("settings rejected: {0}")]
    Settings(#[from] SettingsError),
    #[error("market data fetch failed: {0}")]
    Feed(#[from] FeedError),
    #[error("strike selection failed: {0}")]
    Chain(#[from] ChainError),
}

pub struct Engine {
    registry: SessionRegistry,
    runner: PeriodicRunner,
    settings: Arc<SettingsStore>,
    feed: Arc<dyn MarketDataSource>,
    journal: Arc<dyn SignalSink>,
    clock: Arc<dyn Clock>,
    hours: MarketHours,
    schedule: ScheduleConfig,
    buffers: BufferConfig,
}

/// Collaborators an [`Engine`] is built from.
pub struct EngineParts {
    pub settings: Arc<SettingsStore>,
    pub feed: Arc<dyn MarketDataSource>,
    pub journal: Arc<dyn SignalSink>,
    pub clock: Arc<dyn Clock>,
    pub hours: MarketHours,
    pub schedule: ScheduleConfig,
    pub buffers: BufferConfig,
}

impl Engine {
    pub fn new(parts: EngineParts) -> Self {
        Self {
            registry: SessionRegistry::new(),
            runner: PeriodicRunner::new(parts.clock.clone()),
            settings: parts.settings,
            feed: parts.feed,
            journal: parts.journal,
            clock: parts.clock,
            hours: parts.hours,
            schedule: parts.schedule,
            buffers: parts.buffers,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn hours(&self) -> &MarketHours {
        &self.hours
    }

    /// Create fresh state for `id` without scheduling anything. Replaces
    /// existing state.
    pub fn open_session(&self, id: &SessionId) -> SharedSession {
        let session = Session::with_capacity(
            id.clone(),
            self.clock.now(),
            self.buffers.sample_capacity,
            self.buffers.candle_capacity,
        );
        self.registry.create(session)
    }

    /// Create the session and start its periodic jobs. A repeated login
    /// resets state and restarts the jobs.
    pub fn login(self: &Arc<Self>, id: &SessionId) {
        self.runner.deregister(id);
        self.open_session(id);
        let handler: Arc<dyn JobHandler> = Arc::new(EngineJobs(Arc::downgrade(self)));
        for job in session_jobs(id, &self.schedule) {
            self.runner.register(job, handler.clone());
        }
        info!(session = %id, "session started");
    }

    /// Stop the session's jobs and discard its state.
    pub fn logout(&self, id: &SessionId) -> bool {
        let stopped = self.runner.deregister(id);
        let existed = self.registry.remove(id);
        if existed {
            info!(session = %id, jobs = stopped, "session ended");
        }
        existed
    }

    pub fn sessions(&self) -> Vec<SessionId> {
        self.registry.ids()
    }

    pub fn job_count(&self, id: &SessionId) -> usize {
        self.runner.job_count(id)
    }

    pub async fn status(&self, id: &SessionId) -> Option<SessionStatus> {
        let session = self.registry.get(id)?;
        let s = session.lock().await;
        Some(s.status())
    }

    /// The last exit for `id`, returned once.
    pub async fn take_exit_notice(&self, id: &SessionId) -> Option<ExitNotice> {
        let session = self.registry.get(id)?;
        let mut s = session.lock().await;
        s.take_exit_notice()
    }

    pub fn history(&self) -> Result<Vec<SignalRecord>, JournalError> {
        self.journal.history()
    }

    /// Execute one step for one session.
    pub async fn run_job(&self, kind: JobKind, id: &SessionId) -> Result<StepReport, EngineError> {
        let settings = self.settings.snapshot().map_err(|e| {
            error!(session = %id, job = %kind, error = %e, "settings parse failed; cycle skipped");
            e
        })?;
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| EngineError::UnknownSession(id.clone()))?;
        let now = self.clock.now();
        let ctx = CycleContext {
            settings: &settings,
            hours: &self.hours,
            sink: self.journal.as_ref(),
        };

        let report = match kind {
            JobKind::Ingest => {
                if !self.hours.is_open(now) {
                    StepOutcome::MarketClosed.into()
                } else {
                    let chain = self.feed.fetch(id).await.map_err(|e| {
                        warn!(session = %id, feed = self.feed.name(), error = %e, "fetch failed; cycle skipped");
                        e
                    })?;
                    let mut session = session.lock().await;
                    let held = session.held_strike().and_then(|k| chain.snapshot_at(k));
                    let snapshot = match held {
                        Some(snapshot) => snapshot,
                        None => chain.select_strike(settings.strike_otm_offset).map_err(|e| {
                            warn!(session = %id, error = %e, "strike selection failed; cycle skipped");
                            e
                        })?,
                    };
                    session.ingest(&snapshot, now, &ctx)
                }
            }
            JobKind::Confirm => session.lock().await.confirm_or_exit(now, &ctx),
            JobKind::Candle => session.lock().await.aggregate_candle(now, &ctx),
            JobKind::Regime => session.lock().await.evaluate_regime(now, &ctx),
        };
        log_report(id, kind, &report);
        Ok(report)
    }
}

fn log_report(id: &SessionId, kind: JobKind, report: &StepReport) {
    if let Some(e) = &report.journal_error {
        warn!(session = %id, job = %kind, error = %e, "journal write failed");
    }
    match &report.outcome {
        StepOutcome::Regime {
            bias,
            market_type,
            entry,
        } => match entry {
            EntryOutcome::Created(c) => info!(
                session = %id, setup = %c.kind, price = c.price, premium = c.signal_premium,
                %bias, %market_type, "candidate detected"
            ),
            EntryOutcome::Dropped { kind: setup, reason } => debug!(
                session = %id, setup = %setup, ?reason, "detection dropped"
            ),
            EntryOutcome::None => debug!(session = %id, %bias, %market_type, "regime evaluated"),
        },
        StepOutcome::Approved(c) => info!(
            session = %id, setup = %c.kind, stop = ?c.stop_loss, target = ?c.target,
            "entry approved"
        ),
        StepOutcome::Exited(n) => info!(
            session = %id, setup = %n.kind, reason = %n.reason, premium = ?n.exit_premium,
            "candidate closed"
        ),
        StepOutcome::ClearedOutsideHours(setup) => {
            info!(session = %id, setup = %setup, "candidate cleared outside market hours")
        }
        StepOutcome::CandleAppended(c) => debug!(session = %id, close = c.close, "candle appended"),
        other => debug!(session = %id, job = %kind, outcome = ?other, "step"),
    }
}

/// Scheduled jobs hold the engine weakly; the engine owns the runner that
/// owns the jobs, so dropping the last engine handle stops every job.
struct EngineJobs(Weak<Engine>);

#[async_trait]
impl JobHandler for EngineJobs {
    async fn run(&self, kind: JobKind, session: &SessionId) {
        let Some(engine) = self.0.upgrade() else {
            return;
        };
        if let Err(e) = engine.run_job(kind, session).await {
            debug!(session = %session, job = %kind, error = %e, "job failed");
        }
    }
}
