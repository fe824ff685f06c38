//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n values are NaN (need n price changes).

use crate::domain::indicator::on_valid;

pub fn calculate_rsi(values: &[f64], window: usize) -> Vec<f64> {
    on_valid(values, |v| rsi_raw(v, window))
}

fn rsi_raw(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() <= window {
        return out;
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| c.max(0.0);
    let loss = |c: f64| (-c).max(0.0);

    let mut avg_gain = changes[..window].iter().copied().map(gain).sum::<f64>() / window as f64;
    let mut avg_loss = changes[..window].iter().copied().map(loss).sum::<f64>() / window as f64;
    out[window] = rsi_value(avg_gain, avg_loss);

    let n = window as f64;
    for i in (window + 1)..values.len() {
        let change = changes[i - 1];
        avg_gain = (avg_gain * (n - 1.0) + gain(change)) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss(change)) / n;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
