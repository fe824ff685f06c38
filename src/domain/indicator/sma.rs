//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(x[i-n+1..=i]). Warmup: first (n-1) values are NaN.

use crate::domain::indicator::{mean, on_valid, rolling};

pub fn calculate_sma(values: &[f64], window: usize) -> Vec<f64> {
    on_valid(values, |v| rolling(v, window, mean))
}
