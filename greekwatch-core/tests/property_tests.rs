//! Property tests for buffer and feature invariants.
//!
//! Uses proptest to verify:
//! 1. Buffer capacity: length never exceeds capacity, eviction is FIFO
//! 2. Degenerate windows: calculators return exactly 0.0 on short or gapped input
//! 3. Body ratio bounds: always within [0, 1]
//! 4. Swing edges: first and last candle are never swing points
//! 5. Monotone highs: a rising high series has no swing highs

use chrono::{Duration, NaiveDate, NaiveDateTime};
use greekwatch_core::buffers::{RollingBuffer, SampleBuffer};
use greekwatch_core::domain::Candle;
use greekwatch_core::features::{
    body_ratio, change, percent_change, slope, stability, swing_points, SwingKind, Window,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap()
}

fn arb_sample() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (-1000.0..1000.0_f64).prop_map(Some),
        1 => Just(None),
    ]
}

fn arb_candle() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    let range = prop_oneof![1 => Just(0.0), 9 => 0.5..10.0_f64];
    (50.0..150.0_f64, range, 0.0..1.0_f64, 0.0..1.0_f64).prop_map(
        |(low, range, o, c)| {
            let high = low + range;
            (low + range * o, high, low, low + range * c)
        },
    )
}

fn to_candles(rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: start() + Duration::minutes(5 * i as i64),
            open,
            high,
            low,
            close,
        })
        .collect()
}

// ── 1. Buffer capacity ───────────────────────────────────────────────

proptest! {
    /// Length is bounded by capacity and the buffer keeps the newest items.
    #[test]
    fn buffer_never_exceeds_capacity(
        cap in 1usize..50,
        items in prop::collection::vec(any::<i32>(), 0..200),
    ) {
        let mut b = RollingBuffer::new(cap);
        for (i, item) in items.iter().enumerate() {
            b.push(*item);
            prop_assert!(b.len() <= cap);
            prop_assert_eq!(b.len(), (i + 1).min(cap));
        }
        let keep = items.len().min(cap);
        prop_assert_eq!(b.to_vec(), items[items.len() - keep..].to_vec());
    }
}

// ── 2. Degenerate windows ────────────────────────────────────────────

proptest! {
    /// Fewer samples than the window needs → exactly 0.0.
    #[test]
    fn short_buffer_yields_zero(
        values in prop::collection::vec(-100.0..100.0_f64, 0..10),
        extra in 1usize..5,
    ) {
        let mut b = SampleBuffer::new(30);
        for v in &values {
            b.push(Some(*v));
        }
        let w = Window::Samples(values.len() + extra);
        prop_assert_eq!(slope(&b, w), 0.0);
        prop_assert_eq!(percent_change(&b, w), 0.0);
        prop_assert_eq!(stability(&b, w), 0.0);
        prop_assert_eq!(change(&b, w), 0.0);
    }

    /// Any gap inside the window → exactly 0.0.
    #[test]
    fn gap_in_window_yields_zero(
        samples in prop::collection::vec(arb_sample(), 1..30),
        n in 1usize..30,
    ) {
        let mut b = SampleBuffer::new(30);
        for s in &samples {
            b.push(*s);
        }
        let n = n.min(samples.len());
        let window = &samples[samples.len() - n..];
        prop_assume!(window.iter().any(|s| s.is_none()));
        let w = Window::Samples(n);
        prop_assert_eq!(slope(&b, w), 0.0);
        prop_assert_eq!(percent_change(&b, w), 0.0);
        prop_assert_eq!(stability(&b, w), 0.0);
        prop_assert_eq!(change(&b, w), 0.0);
    }

    /// Stability is a standard deviation, never negative.
    #[test]
    fn stability_non_negative(values in prop::collection::vec(-100.0..100.0_f64, 1..30)) {
        let mut b = SampleBuffer::new(30);
        for v in &values {
            b.push(Some(*v));
        }
        prop_assert!(stability(&b, Window::Samples(values.len())) >= 0.0);
    }
}

// ── 3. Body ratio ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn body_ratio_within_unit_interval(row in arb_candle()) {
        let c = &to_candles(&[row])[0];
        let r = body_ratio(c);
        prop_assert!((0.0..=1.0 + 1e-9).contains(&r), "ratio {}", r);
        if c.high == c.low {
            prop_assert_eq!(r, 0.0);
        }
    }
}

// ── 4–5. Swing points ────────────────────────────────────────────────

proptest! {
    #[test]
    fn first_and_last_candle_never_swing(rows in prop::collection::vec(arb_candle(), 3..40)) {
        let candles = to_candles(&rows);
        let first = candles[0].timestamp;
        let last = candles[candles.len() - 1].timestamp;
        for p in swing_points(&candles) {
            prop_assert!(p.timestamp != first && p.timestamp != last);
        }
    }

    #[test]
    fn rising_highs_have_no_swing_high(
        base in 50.0..100.0_f64,
        steps in prop::collection::vec(0.01..5.0_f64, 3..40),
    ) {
        let mut high = base;
        let rows: Vec<_> = steps
            .iter()
            .map(|s| {
                high += s;
                (high - 1.0, high, high - 2.0, high - 0.5)
            })
            .collect();
        let candles = to_candles(&rows);
        prop_assert!(swing_points(&candles).iter().all(|p| p.kind != SwingKind::High));
    }
}
