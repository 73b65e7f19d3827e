//! Engine integration tests: one step at a time against a manual clock and
//! a scripted feed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use greekwatch_core::domain::{
    Bias, CandidateSetup, CandidateStatus, Direction, OptionChain, SessionId, SetupKind,
    SetupPattern,
};
use greekwatch_core::journal::MemoryJournal;
use greekwatch_core::{MarketHours, StepOutcome};
use greekwatch_runner::feed::synthetic_chain;
use greekwatch_runner::{
    BufferConfig, Clock, Engine, EngineError, EngineParts, FeedError, JobKind, ManualClock,
    MarketDataSource, ScheduleConfig, SettingsStore,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

struct ScriptedFeed {
    clock: Arc<ManualClock>,
    price: Mutex<f64>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            price: Mutex::new(22_000.0),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    fn set_price(&self, p: f64) {
        *self.price.lock().unwrap() = p;
    }
}

#[async_trait]
impl MarketDataSource for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, _session: &SessionId) -> Result<OptionChain, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::Unavailable("HTTP 503".into()));
        }
        let price = *self.price.lock().unwrap();
        Ok(synthetic_chain(self.clock.now(), price, 14.0))
    }
}

struct Harness {
    engine: Arc<Engine>,
    clock: Arc<ManualClock>,
    feed: Arc<ScriptedFeed>,
    id: SessionId,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(at(9, 15, 0)));
    let feed = Arc::new(ScriptedFeed::new(clock.clone()));
    let engine = Arc::new(Engine::new(EngineParts {
        settings: Arc::new(SettingsStore::new()),
        feed: feed.clone(),
        journal: Arc::new(MemoryJournal::new()),
        clock: clock.clone(),
        hours: MarketHours::default(),
        schedule: ScheduleConfig::default(),
        buffers: BufferConfig::default(),
    }));
    let id = SessionId::new("trader-1");
    engine.open_session(&id);
    Harness {
        engine,
        clock,
        feed,
        id,
    }
}

// ── Steps ────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_selects_strike_and_records_sample() {
    let h = harness();
    let r = h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap();
    assert_eq!(r.outcome, StepOutcome::Ingested { baseline_captured: false });

    let status = h.engine.status(&h.id).await.unwrap();
    assert_eq!(status.latest_price, Some(22_000.0));
    assert!(status.latest_premium.is_some());
}

#[tokio::test]
async fn fetch_failure_skips_cycle_without_touching_state() {
    let h = harness();
    h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap();

    h.feed.fail.store(true, Ordering::SeqCst);
    h.feed.set_price(22_500.0);
    h.clock.advance(Duration::seconds(10));
    let err = h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Feed(_)));

    let status = h.engine.status(&h.id).await.unwrap();
    assert_eq!(status.latest_price, Some(22_000.0));

    // Next cycle recovers.
    h.feed.fail.store(false, Ordering::SeqCst);
    h.clock.advance(Duration::seconds(10));
    h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap();
    let status = h.engine.status(&h.id).await.unwrap();
    assert_eq!(status.latest_price, Some(22_500.0));
}

#[tokio::test]
async fn unparsable_setting_fails_only_that_cycle() {
    let h = harness();
    h.engine.settings().insert_raw("ema_period", "twenty");
    let err = h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Settings(_)));
    assert_eq!(h.feed.calls.load(Ordering::SeqCst), 0);

    h.engine.settings().set("ema_period", "20").unwrap();
    assert!(h.engine.run_job(JobKind::Ingest, &h.id).await.is_ok());
}

#[tokio::test]
async fn closed_market_skips_fetch() {
    let h = harness();
    h.clock.set(at(8, 0, 0));
    let r = h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap();
    assert_eq!(r.outcome, StepOutcome::MarketClosed);
    assert_eq!(h.feed.calls.load(Ordering::SeqCst), 0);

    let r = h.engine.run_job(JobKind::Regime, &h.id).await.unwrap();
    assert_eq!(r.outcome, StepOutcome::MarketClosed);
}

#[tokio::test]
async fn candle_forms_after_thirty_samples() {
    let h = harness();
    for i in 0..30 {
        h.feed.set_price(22_000.0 + i as f64);
        h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap();
        h.clock.advance(Duration::seconds(10));
    }
    let r = h.engine.run_job(JobKind::Candle, &h.id).await.unwrap();
    let StepOutcome::CandleAppended(c) = r.outcome else {
        panic!("expected a candle, got {:?}", r.outcome);
    };
    assert_eq!(c.open, 22_000.0);
    assert_eq!(c.close, 22_029.0);
    assert_eq!(c.high, 22_029.0);

    // No baseline yet at 09:20 and flat Greeks: regime stays neutral.
    let r = h.engine.run_job(JobKind::Regime, &h.id).await.unwrap();
    assert!(matches!(r.outcome, StepOutcome::Regime { bias: Bias::Neutral, .. }));
}

#[tokio::test]
async fn unknown_session_is_an_error() {
    let h = harness();
    let err = h
        .engine
        .run_job(JobKind::Confirm, &SessionId::new("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownSession(_)));
}

#[tokio::test]
async fn idle_confirm_and_no_exit_notice() {
    let h = harness();
    let r = h.engine.run_job(JobKind::Confirm, &h.id).await.unwrap();
    assert_eq!(r.outcome, StepOutcome::Idle);
    assert!(h.engine.take_exit_notice(&h.id).await.is_none());
    assert!(h.engine.history().unwrap().is_empty());
}

#[tokio::test]
async fn open_candidate_keeps_its_strike_as_the_underlying_moves() {
    let h = harness();
    let shared = h.engine.open_session(&h.id);
    {
        let mut s = shared.lock().await;
        let mut c = CandidateSetup::new(
            SetupKind::new(SetupPattern::Breakout, Direction::Bullish),
            at(9, 15, 0),
            22_000.0,
            100.0,
            Some(22_150.0),
        );
        c.status = CandidateStatus::EntryApproved;
        c.stop_loss = Some(99.0);
        c.target = Some(102.0);
        s.candidate = Some(c);
    }

    // ATM+2 would be 22_100 at 22_000 and 22_500 at 22_400.
    for price in [22_000.0, 22_400.0] {
        h.feed.set_price(price);
        h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap();
        let expected = synthetic_chain(h.clock.now(), price, 14.0)
            .snapshot_at(22_150.0)
            .unwrap()
            .premium;
        let s = shared.lock().await;
        assert_eq!(s.strike, Some(22_150.0));
        assert_eq!(s.buffers.premium.latest_value(), expected);
    }

    // Once the candidate is gone, selection follows the market again.
    shared.lock().await.candidate = None;
    h.engine.run_job(JobKind::Ingest, &h.id).await.unwrap();
    assert_eq!(shared.lock().await.strike, Some(22_500.0));
}

// ── Login / logout ───────────────────────────────────────────────────

#[tokio::test]
async fn login_schedules_four_jobs_and_logout_discards() {
    let h = harness();
    let other = SessionId::new("trader-2");
    h.engine.login(&other);
    assert_eq!(h.engine.job_count(&other), 4);
    assert_eq!(h.engine.sessions().len(), 2);

    // Repeated login restarts rather than duplicating jobs.
    h.engine.login(&other);
    assert_eq!(h.engine.job_count(&other), 4);

    assert!(h.engine.logout(&other));
    assert_eq!(h.engine.job_count(&other), 0);
    assert!(h.engine.status(&other).await.is_none());
    assert!(!h.engine.logout(&other));
    assert_eq!(h.engine.sessions(), vec![h.id.clone()]);
}

#[tokio::test]
async fn scheduled_jobs_do_not_keep_the_engine_alive() {
    let h = harness();
    let weak = Arc::downgrade(&h.engine);
    h.engine.login(&SessionId::new("trader-2"));
    assert_eq!(h.engine.job_count(&SessionId::new("trader-2")), 4);
    assert_eq!(Arc::strong_count(&h.engine), 1);

    drop(h);
    assert!(weak.upgrade().is_none());
}
