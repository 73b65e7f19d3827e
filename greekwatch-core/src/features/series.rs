//! Window statistics over metric sample buffers.
//!
//! Every function returns exactly 0.0 when the buffer holds fewer samples
//! than the window needs or any sample in the window is absent.

use super::Window;
use crate::buffers::SampleBuffer;

/// (latest - earliest) / updates.
pub fn slope(buffer: &SampleBuffer, window: Window) -> f64 {
    let n = window.updates();
    match buffer.window(n) {
        Some(w) => (w[n - 1] - w[0]) / n as f64,
        None => 0.0,
    }
}

/// (latest - earliest) / earliest * 100, 0.0 when earliest is zero.
pub fn percent_change(buffer: &SampleBuffer, window: Window) -> f64 {
    let n = window.updates();
    match buffer.window(n) {
        Some(w) if w[0] != 0.0 => (w[n - 1] - w[0]) / w[0] * 100.0,
        _ => 0.0,
    }
}

/// latest - earliest, in the metric's own units.
pub fn change(buffer: &SampleBuffer, window: Window) -> f64 {
    let n = window.updates();
    match buffer.window(n) {
        Some(w) => w[n - 1] - w[0],
        None => 0.0,
    }
}

/// Population standard deviation of the window.
pub fn stability(buffer: &SampleBuffer, window: Window) -> f64 {
    let n = window.updates();
    let Some(w) = buffer.window(n) else {
        return 0.0;
    };
    let mean = w.iter().sum::<f64>() / n as f64;
    let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    var.sqrt()
}
