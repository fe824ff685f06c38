//! Donchian channel.
//!
//! hband = rolling max(high), lband = rolling min(low), mband = midpoint,
//! wband = (hband - lband) / mband × 100, pband = (close - lband) / (hband - lband).

use crate::domain::indicator::{on_valid_many, rolling, safe_div};

pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct DonchianOutput {
    pub hband: Vec<f64>,
    pub lband: Vec<f64>,
    pub mband: Vec<f64>,
    pub wband: Vec<f64>,
    pub pband: Vec<f64>,
}

pub fn calculate_donchian(high: &[f64], low: &[f64], close: &[f64], window: usize) -> DonchianOutput {
    let hband = on_valid_many(&[high, low, close], |s| {
        rolling(s[0], window, |w| w.iter().copied().fold(f64::MIN, f64::max))
    });
    let lband = on_valid_many(&[high, low, close], |s| {
        rolling(s[1], window, |w| w.iter().copied().fold(f64::MAX, f64::min))
    });

    let n = hband.len();
    let mband: Vec<f64> = (0..n).map(|i| (hband[i] + lband[i]) / 2.0).collect();
    let wband = (0..n)
        .map(|i| safe_div(hband[i] - lband[i], mband[i]) * 100.0)
        .collect();
    let pband = (0..n)
        .map(|i| safe_div(close[i] - lband[i], hband[i] - lband[i]))
        .collect();

    DonchianOutput {
        hband,
        lband,
        mband,
        wband,
        pband,
    }
}
