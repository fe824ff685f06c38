//! Kaufman's Adaptive Moving Average.
//!
//! ER = |x[i] - x[i-n]| / sum(|x[j] - x[j-1]|, j in i-n+1..=i)
//! SC = (ER * (fast_sc - slow_sc) + slow_sc)^2, fast_sc = 2/(pow1+1), slow_sc = 2/(pow2+1)
//! KAMA[i] = KAMA[i-1] + SC * (x[i] - KAMA[i-1]), seeded with x[n-1].
//!
//! Warmup: first (n-1) values are NaN.

use crate::domain::indicator::on_valid;

pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_POW1: usize = 2;
pub const DEFAULT_POW2: usize = 30;

pub fn calculate_kama(values: &[f64], window: usize, pow1: usize, pow2: usize) -> Vec<f64> {
    on_valid(values, |v| kama_raw(v, window, pow1, pow2))
}

fn kama_raw(values: &[f64], window: usize, pow1: usize, pow2: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let fast_sc = 2.0 / (pow1 as f64 + 1.0);
    let slow_sc = 2.0 / (pow2 as f64 + 1.0);

    let mut kama = values[window - 1];
    out[window - 1] = kama;

    for i in window..values.len() {
        let change = (values[i] - values[i - window]).abs();
        let volatility: f64 = (i + 1 - window..=i)
            .map(|j| (values[j] - values[j - 1]).abs())
            .sum();
        let er = if volatility == 0.0 { 0.0 } else { change / volatility };
        let sc = (er * (fast_sc - slow_sc) + slow_sc).powi(2);
        kama += sc * (values[i] - kama);
        out[i] = kama;
    }
    out
}
