//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP)) / (constant × mean absolute deviation of TP),
//! TP = (high + low + close) / 3. Zero deviation yields 0.

use crate::domain::indicator::{mean, on_valid_many, rolling};

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_CONSTANT: f64 = 0.015;

pub fn calculate_cci(high: &[f64], low: &[f64], close: &[f64], window: usize, constant: f64) -> Vec<f64> {
    on_valid_many(&[high, low, close], |s| {
        let tp: Vec<f64> = (0..s[0].len())
            .map(|i| (s[0][i] + s[1][i] + s[2][i]) / 3.0)
            .collect();
        rolling(&tp, window, |w| {
            let m = mean(w);
            let md = w.iter().map(|x| (x - m).abs()).sum::<f64>() / w.len() as f64;
            let last = w[w.len() - 1];
            if md == 0.0 { 0.0 } else { (last - m) / (constant * md) }
        })
    })
}
