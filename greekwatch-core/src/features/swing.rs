//! Swing points: interior candles whose high (low) strictly exceeds (undercuts)
//! both neighbours. The first and last candle are never flagged.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub kind: SwingKind,
    pub price: f64,
    pub timestamp: NaiveDateTime,
}

/// Chronological swing points; a candle may produce both a high and a low.
pub fn swing_points(candles: &[Candle]) -> Vec<SwingPoint> {
    let mut points = Vec::new();
    if candles.len() < 3 {
        return points;
    }
    for w in candles.windows(3) {
        let (prev, cur, next) = (&w[0], &w[1], &w[2]);
        if cur.high > prev.high && cur.high > next.high {
            points.push(SwingPoint {
                kind: SwingKind::High,
                price: cur.high,
                timestamp: cur.timestamp,
            });
        }
        if cur.low < prev.low && cur.low < next.low {
            points.push(SwingPoint {
                kind: SwingKind::Low,
                price: cur.low,
                timestamp: cur.timestamp,
            });
        }
    }
    points
}

/// Most recent swing of `kind`.
pub fn last_swing(points: &[SwingPoint], kind: SwingKind) -> Option<&SwingPoint> {
    points.iter().rev().find(|p| p.kind == kind)
}

/// The last `n` swings of `kind`, oldest first. `None` if fewer exist.
pub fn recent_swings(points: &[SwingPoint], kind: SwingKind, n: usize) -> Option<Vec<f64>> {
    let prices: Vec<f64> = points
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| p.price)
        .collect();
    if prices.len() < n {
        return None;
    }
    Some(prices[prices.len() - n..].to_vec())
}
