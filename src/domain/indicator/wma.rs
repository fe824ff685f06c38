//! Weighted Moving Average indicator.
//!
//! O(n) sliding window:
//! WMA(n) = (1*x[i-n+1] + 2*x[i-n+2] + ... + n*x[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) values are NaN.

use crate::domain::indicator::on_valid;

pub fn calculate_wma(values: &[f64], window: usize) -> Vec<f64> {
    on_valid(values, |v| wma_raw(v, window))
}

fn wma_raw(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 {
        return out;
    }

    let divisor = (window * (window + 1)) as f64 / 2.0;
    let mut weighted_sum = 0.0;
    let mut window_sum = 0.0;

    for (i, &x) in values.iter().enumerate() {
        if i < window {
            weighted_sum += (i + 1) as f64 * x;
            window_sum += x;
        } else {
            weighted_sum += window as f64 * x - window_sum;
            window_sum += x - values[i - window];
        }
        if i + 1 >= window {
            out[i] = weighted_sum / divisor;
        }
    }
    out
}
