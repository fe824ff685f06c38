//! Know Sure Thing oscillator.
//!
//! KST = 1×SMA(ROC(r1), w1) + 2×SMA(ROC(r2), w2) + 3×SMA(ROC(r3), w3) + 4×SMA(ROC(r4), w4)
//! signal = SMA(KST, nsig), diff = KST - signal.

use crate::domain::indicator::{calculate_roc, calculate_sma, subtract};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KstParams {
    pub roc: [usize; 4],
    pub window: [usize; 4],
    pub nsig: usize,
}

impl Default for KstParams {
    fn default() -> Self {
        Self {
            roc: [10, 15, 20, 30],
            window: [10, 10, 10, 15],
            nsig: 9,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KstOutput {
    pub kst: Vec<f64>,
    pub signal: Vec<f64>,
    pub diff: Vec<f64>,
}

pub fn calculate_kst(values: &[f64], params: &KstParams) -> KstOutput {
    let mut kst = vec![0.0; values.len()];
    for (k, (&roc, &window)) in params.roc.iter().zip(&params.window).enumerate() {
        let smoothed = calculate_sma(&calculate_roc(values, roc), window);
        let weight = (k + 1) as f64;
        for (acc, v) in kst.iter_mut().zip(&smoothed) {
            *acc += weight * v;
        }
    }
    let signal = calculate_sma(&kst, params.nsig);
    let diff = subtract(&kst, &signal);
    KstOutput { kst, signal, diff }
}
