//! Average True Range (Wilder).
//!
//! TR[0] = high - low, TR[i] = max(h-l, |h-c[i-1]|, |l-c[i-1]|).
//! ATR seeded with the mean of the first n TRs, then
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) values are NaN.

use crate::domain::indicator::on_valid_many;

pub fn calculate_atr(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Vec<f64> {
    on_valid_many(&[high, low, close], |s| {
        wilder_average(&true_ranges(s[0], s[1], s[2]), window)
    })
}

pub(crate) fn true_ranges(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..high.len())
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                hl
            } else {
                let hc = (high[i] - close[i - 1]).abs();
                let lc = (low[i] - close[i - 1]).abs();
                hl.max(hc).max(lc)
            }
        })
        .collect()
}

/// Wilder smoothing seeded with a simple mean of the first `window` values.
pub(crate) fn wilder_average(tr: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; tr.len()];
    if window == 0 || tr.len() < window {
        return out;
    }

    let n = window as f64;
    let mut atr = tr[..window].iter().sum::<f64>() / n;
    out[window - 1] = atr;
    for i in window..tr.len() {
        atr = (atr * (n - 1.0) + tr[i]) / n;
        out[i] = atr;
    }
    out
}
