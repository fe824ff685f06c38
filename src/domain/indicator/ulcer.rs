//! Ulcer Index.
//!
//! drawdown[i] = (x[i] - max(x[i-n+1..=i])) / max(...) × 100
//! UI[i] = sqrt(mean(drawdown²) over the last n drawdowns)
//! Warmup: first 2(n-1) values are NaN.

use crate::domain::indicator::{mean, on_valid, rolling, safe_div};

pub const DEFAULT_WINDOW: usize = 14;

pub fn calculate_ulcer_index(values: &[f64], window: usize) -> Vec<f64> {
    on_valid(values, |v| {
        let highest = rolling(v, window, |w| w.iter().copied().fold(f64::MIN, f64::max));
        let squared: Vec<f64> = v
            .iter()
            .zip(&highest)
            .map(|(x, h)| {
                let dd = safe_div(x - h, *h) * 100.0;
                dd * dd
            })
            .collect();
        on_valid(&squared, |sq| rolling(sq, window, |w| mean(w).sqrt()))
    })
}
