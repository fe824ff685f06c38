//! Bollinger Bands indicator.
//!
//! - Middle (mavg): Simple Moving Average over n periods
//! - Upper (hband): Middle + (multiplier × StdDev)
//! - Lower (lband): Middle - (multiplier × StdDev)
//! - Width (wband): (Upper - Lower) / Middle × 100
//! - Percent (pband): (x - Lower) / (Upper - Lower)
//!
//! StdDev is population standard deviation (divides by N, not N-1).
//! Default parameters: window=20, multiplier=2.0.

use crate::domain::indicator::stddev::population_stddev;
use crate::domain::indicator::{calculate_sma, on_valid, rolling, safe_div};

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_WINDOW_DEV: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct BollingerOutput {
    pub mavg: Vec<f64>,
    pub hband: Vec<f64>,
    pub lband: Vec<f64>,
    pub wband: Vec<f64>,
    pub pband: Vec<f64>,
}

pub fn calculate_bollinger(values: &[f64], window: usize, window_dev: f64) -> BollingerOutput {
    let mavg = calculate_sma(values, window);
    let std = on_valid(values, |v| rolling(v, window, population_stddev));

    let hband: Vec<f64> = mavg.iter().zip(&std).map(|(m, s)| m + window_dev * s).collect();
    let lband: Vec<f64> = mavg.iter().zip(&std).map(|(m, s)| m - window_dev * s).collect();
    let wband = (0..values.len())
        .map(|i| safe_div(hband[i] - lband[i], mavg[i]) * 100.0)
        .collect();
    let pband = (0..values.len())
        .map(|i| safe_div(values[i] - lband[i], hband[i] - lband[i]))
        .collect();

    BollingerOutput {
        mavg,
        hband,
        lband,
        wband,
        pband,
    }
}
