//! Periodic job runner.
//!
//! Each registered job is a tokio task ticking on its own interval. The
//! first tick is aligned to the exchange wall clock: a job with period `p`
//! and offset `o` fires at every instant `t` with `t mod p == o`. Ticks
//! missed while a job is still running are skipped, never queued.
//!
//! Each run is spawned as its own task, so a panicking step is logged and
//! the loop carries on.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use greekwatch_core::domain::SessionId;

use crate::clock::Clock;
use crate::config::ScheduleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobKind {
    Ingest,
    Confirm,
    Candle,
    Regime,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::Ingest,
        JobKind::Confirm,
        JobKind::Candle,
        JobKind::Regime,
    ];
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobKind::Ingest => "ingest",
            JobKind::Confirm => "confirm",
            JobKind::Candle => "candle",
            JobKind::Regime => "regime",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub session: SessionId,
    pub kind: JobKind,
    pub period: Duration,
    pub offset: Duration,
}

/// The four per-session jobs with their configured timings.
pub fn session_jobs(session: &SessionId, schedule: &ScheduleConfig) -> Vec<JobDescriptor> {
    JobKind::ALL
        .iter()
        .map(|&kind| {
            let timing = match kind {
                JobKind::Ingest => schedule.ingest,
                JobKind::Confirm => schedule.confirm,
                JobKind::Candle => schedule.candle,
                JobKind::Regime => schedule.regime,
            };
            JobDescriptor {
                session: session.clone(),
                kind,
                period: timing.period(),
                offset: timing.offset(),
            }
        })
        .collect()
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one step. Failures are the handler's to log; nothing returned
    /// here can stop the schedule.
    async fn run(&self, kind: JobKind, session: &SessionId);
}

/// Seconds from `now_secs` until the next instant congruent to `offset`
/// modulo `period`. Zero when `now_secs` is on such an instant.
pub fn first_fire_delay(now_secs: i64, period_secs: u64, offset_secs: u64) -> u64 {
    let period = period_secs.max(1) as i64;
    let offset = (offset_secs as i64).rem_euclid(period);
    let since = (now_secs - offset).rem_euclid(period);
    if since == 0 {
        0
    } else {
        (period - since) as u64
    }
}

pub struct PeriodicRunner {
    clock: Arc<dyn Clock>,
    jobs: Mutex<HashMap<SessionId, Vec<JoinHandle<()>>>>,
}

impl PeriodicRunner {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Start ticking `job`. Must be called inside a tokio runtime.
    ///
    /// Returns false (and schedules nothing) for a zero period.
    pub fn register(&self, job: JobDescriptor, handler: Arc<dyn JobHandler>) -> bool {
        if job.period.is_zero() {
            warn!(session = %job.session, job = %job.kind, "zero period, job not scheduled");
            return false;
        }
        let now_secs = self.clock.now().and_utc().timestamp();
        let delay = first_fire_delay(now_secs, job.period.as_secs(), job.offset.as_secs());
        debug!(session = %job.session, job = %job.kind, delay_secs = delay, "job registered");

        let session = job.session.clone();
        let handle = tokio::spawn(async move {
            let start = Instant::now() + Duration::from_secs(delay);
            let mut ticker = interval_at(start, job.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let handler = handler.clone();
                let id = job.session.clone();
                let kind = job.kind;
                let run = tokio::spawn(async move { handler.run(kind, &id).await });
                if let Err(e) = run.await {
                    if e.is_panic() {
                        warn!(session = %job.session, job = %kind, "job panicked; schedule continues");
                    }
                }
            }
        });

        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.entry(session).or_default().push(handle);
        true
    }

    /// Stop every job of `session`. Returns how many were stopped.
    pub fn deregister(&self, session: &SessionId) -> usize {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let handles = jobs.remove(session).unwrap_or_default();
        for h in &handles {
            h.abort();
        }
        handles.len()
    }

    pub fn job_count(&self, session: &SessionId) -> usize {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.get(session).map_or(0, Vec::len)
    }

    pub fn shutdown(&self) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        for (_, handles) in jobs.drain() {
            for h in handles {
                h.abort();
            }
        }
    }
}

impl Drop for PeriodicRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
