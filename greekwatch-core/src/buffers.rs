//! Bounded, insertion-ordered sample buffers.
//!
//! One buffer per metric (price, premium, delta, gamma, theta, iv) holds the
//! most recent samples; absent upstream values are stored as `None` so the
//! window calculators can refuse to compute over gaps. A separate buffer holds
//! aggregated candles.

use chrono::NaiveDateTime;
use std::collections::VecDeque;

use crate::domain::{candle_start, Candle, MarketSnapshot};

/// Five minutes of 10-second samples.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 30;
pub const DEFAULT_CANDLE_CAPACITY: usize = 100;
/// Price samples folded into one candle.
pub const SAMPLES_PER_CANDLE: usize = 30;

/// Fixed-capacity FIFO. Pushing onto a full buffer evicts the oldest item.
#[derive(Debug, Clone)]
pub struct RollingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> RollingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// A metric buffer; `None` marks a missing upstream value.
pub type SampleBuffer = RollingBuffer<Option<f64>>;

impl SampleBuffer {
    /// The last `n` samples, oldest first, when all of them are present.
    ///
    /// `None` if `n` is zero, fewer than `n` samples exist, or any sample in
    /// the window is absent.
    pub fn window(&self, n: usize) -> Option<Vec<f64>> {
        if n == 0 || self.len() < n {
            return None;
        }
        self.items.iter().skip(self.len() - n).copied().collect()
    }

    /// Most recent sample, if present.
    pub fn latest_value(&self) -> Option<f64> {
        self.latest().copied().flatten()
    }
}

pub type CandleBuffer = RollingBuffer<Candle>;

/// Per-metric sample buffers of one session.
#[derive(Debug, Clone)]
pub struct MetricBuffers {
    pub price: SampleBuffer,
    pub premium: SampleBuffer,
    pub delta: SampleBuffer,
    pub gamma: SampleBuffer,
    pub theta: SampleBuffer,
    pub iv: SampleBuffer,
}

impl MetricBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            price: SampleBuffer::new(capacity),
            premium: SampleBuffer::new(capacity),
            delta: SampleBuffer::new(capacity),
            gamma: SampleBuffer::new(capacity),
            theta: SampleBuffer::new(capacity),
            iv: SampleBuffer::new(capacity),
        }
    }

    /// Append one sample to every metric buffer.
    pub fn push(&mut self, snapshot: &MarketSnapshot) {
        self.price.push(Some(snapshot.underlying_price));
        self.premium.push(snapshot.premium);
        self.delta.push(snapshot.greeks.delta);
        self.gamma.push(snapshot.greeks.gamma);
        self.theta.push(snapshot.greeks.theta);
        self.iv.push(snapshot.greeks.iv);
    }

    /// Append the underlying price only; every option metric is recorded
    /// as absent. Used for quotes of a contract other than the one held.
    pub fn push_underlying(&mut self, snapshot: &MarketSnapshot) {
        self.price.push(Some(snapshot.underlying_price));
        self.premium.push(None);
        self.delta.push(None);
        self.gamma.push(None);
        self.theta.push(None);
        self.iv.push(None);
    }

    /// Fold the last [`SAMPLES_PER_CANDLE`] price samples into a candle
    /// stamped with the period start of `now`.
    pub fn aggregate_candle(&self, now: NaiveDateTime) -> Option<Candle> {
        let prices = self.price.window(SAMPLES_PER_CANDLE)?;
        Candle::from_prices(candle_start(now), &prices)
    }
}

impl Default for MetricBuffers {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAPACITY)
    }
}
