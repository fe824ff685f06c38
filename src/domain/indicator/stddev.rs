//! Standard Deviation indicator.
//!
//! Population standard deviation over n values.
//! STDDEV(n)[i] = sqrt(sum((x[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) values are NaN.

use crate::domain::indicator::{mean, on_valid, rolling};

pub fn calculate_stddev(values: &[f64], window: usize) -> Vec<f64> {
    on_valid(values, |v| rolling(v, window, population_stddev))
}

pub(crate) fn population_stddev(window: &[f64]) -> f64 {
    let m = mean(window);
    let variance = window.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / window.len() as f64;
    variance.sqrt()
}
