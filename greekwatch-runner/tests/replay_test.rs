//! Offline replay: a flat session from CSV, and a scripted breakout that
//! runs the full detect → approve → stop-loss lifecycle.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use greekwatch_core::domain::{CandidateStatus, Greeks, MarketSnapshot, SessionId};
use greekwatch_core::journal::{MemoryJournal, SignalSink};
use greekwatch_core::lifecycle::ExitReason;
use greekwatch_core::{MarketHours, Settings};
use greekwatch_runner::{load_snapshots_csv, BufferConfig, JsonlJournal, ReplayDriver};

// ── Helpers ──────────────────────────────────────────────────────────

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn driver(journal: Arc<dyn SignalSink>) -> ReplayDriver {
    ReplayDriver::new(
        SessionId::new("replay"),
        Settings::default(),
        MarketHours::default(),
        BufferConfig::default(),
        journal,
    )
}

fn snapshot(
    ts: NaiveDateTime,
    price: f64,
    premium: f64,
    delta: f64,
    gamma: f64,
) -> MarketSnapshot {
    MarketSnapshot {
        timestamp: ts,
        underlying_price: price,
        strike: Some(22_150.0),
        premium: Some(premium),
        greeks: Greeks {
            delta: Some(delta),
            gamma: Some(gamma),
            theta: Some(-6.0),
            iv: Some(14.0),
        },
    }
}

/// Thirty prices whose open, high, low and close are exactly `o h l c`.
fn candle_path(o: f64, h: f64, l: f64, c: f64) -> Vec<f64> {
    let mut path = vec![o, h, l];
    path.extend((1..27).map(|i| l + (c - l) * i as f64 / 27.0));
    path.push(c);
    path
}

/// Six candles: a swing high at 22_060, a swing low at 21_940, then a wide
/// bullish candle closing at 22_099.
const CANDLES: [(f64, f64, f64, f64); 6] = [
    (22_000.0, 22_010.0, 21_990.0, 22_005.0),
    (22_005.0, 22_060.0, 22_000.0, 22_050.0),
    (22_050.0, 22_055.0, 21_960.0, 21_970.0),
    (21_970.0, 22_000.0, 21_940.0, 21_982.0),
    (21_982.0, 22_030.0, 21_970.0, 22_000.0),
    (22_000.0, 22_110.0, 22_000.0, 22_099.0),
];

fn breakout_tape() -> Vec<MarketSnapshot> {
    // First sample at 09:15:10 so each candle period ends on its boundary.
    let start = at(9, 15, 10);
    let mut out = Vec::new();
    let prices: Vec<f64> = CANDLES
        .iter()
        .flat_map(|&(o, h, l, c)| candle_path(o, h, l, c))
        .collect();
    for (i, price) in prices.into_iter().enumerate() {
        let ts = start + Duration::seconds(10 * i as i64);
        out.push(snapshot(
            ts,
            price,
            80.0,
            0.30 + 0.0005 * i as f64,
            0.0020 + 0.000002 * i as f64,
        ));
    }
    let t = at(9, 45, 0);
    // Greeks surge after the breakout, then the premium slips through the stop.
    out.push(snapshot(t + Duration::seconds(10), 22_099.0, 80.0, 0.45, 0.0026));
    out.push(snapshot(t + Duration::seconds(20), 22_099.0, 80.0, 0.50, 0.0029));
    out.push(snapshot(t + Duration::seconds(30), 22_099.0, 80.0, 0.55, 0.0032));
    out.push(snapshot(t + Duration::seconds(40), 22_099.0, 79.0, 0.55, 0.0032));
    out
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn flat_csv_session_builds_candles_without_signals() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tape.csv");
    let mut csv = String::from("timestamp,underlying_price,strike,premium,delta,gamma,theta,iv\n");
    let start = at(9, 15, 0);
    for i in 0..210 {
        let ts = start + Duration::seconds(10 * i);
        writeln!(
            csv,
            "{},22000,22100,80,0.35,0.002,-6,14",
            ts.format("%Y-%m-%d %H:%M:%S")
        )
        .unwrap();
    }
    std::fs::write(&path, csv).unwrap();

    let tape = load_snapshots_csv(&path).unwrap();
    assert_eq!(tape.len(), 210);

    let report = driver(Arc::new(MemoryJournal::new())).run(&tape);
    assert_eq!(report.samples, 210);
    assert_eq!(report.candles, 6);
    assert!(report.detections.is_empty());
    assert!(report.exits.is_empty());

    let status = report.final_status.unwrap();
    assert!(status.baseline.is_some());
    assert_eq!(status.candles, 6);
    assert!(status.candidate.is_none());
}

#[test]
fn breakout_is_detected_approved_and_stopped_out() {
    let dir = TempDir::new().unwrap();
    let journal = Arc::new(JsonlJournal::open(dir.path().join("signals.jsonl")).unwrap());
    let report = driver(journal.clone()).run(&breakout_tape());

    assert_eq!(report.candles, 6);
    assert!(report.journal_errors.is_empty());

    assert_eq!(report.detections.len(), 1);
    let detected = &report.detections[0];
    assert_eq!(detected.kind.to_string(), "Breakout_Bullish");
    assert_eq!(detected.detected_at, at(9, 45, 0));
    assert_eq!(detected.signal_premium, 80.0);

    assert_eq!(report.approvals.len(), 1);
    assert_eq!(report.approvals[0].stop_loss, Some(79.2));
    assert_eq!(report.approvals[0].target, Some(81.6));

    assert_eq!(report.exits.len(), 1);
    assert_eq!(report.exits[0].reason, ExitReason::StopLoss);
    assert_eq!(report.exits[0].exit_premium, Some(79.0));

    let status = report.final_status.unwrap();
    assert!(status.candidate.is_none());
    assert_eq!(status.cooldown_until, Some(at(10, 0, 40)));

    let history = journal.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].signal_type, "Breakout_Bullish");
    assert_eq!(history[0].status, CandidateStatus::Closed);
    assert_eq!(history[0].entry_price, Some(80.0));
    assert_eq!(history[0].result.as_deref(), Some("StopLoss Hit"));
}

#[test]
fn empty_tape_reports_nothing() {
    let report = driver(Arc::new(MemoryJournal::new())).run(&[]);
    assert_eq!(report.samples, 0);
    assert!(report.final_status.is_none());
}
