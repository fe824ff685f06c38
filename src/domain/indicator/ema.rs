//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values are NaN.

use crate::domain::indicator::on_valid;

pub fn calculate_ema(values: &[f64], window: usize) -> Vec<f64> {
    on_valid(values, |v| ema_raw(v, window))
}

fn ema_raw(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let k = 2.0 / (window as f64 + 1.0);
    let mut ema = values[..window].iter().sum::<f64>() / window as f64;
    out[window - 1] = ema;

    for i in window..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = ema;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{assert_series_eq, nan_count};

    #[test]
    fn ema_warmup() {
        let out = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert_eq!(nan_count(&out), 2);
        assert!(!out[2].is_nan());
    }

    #[test]
    fn ema_period_1_is_identity() {
        let out = calculate_ema(&[10.0, 20.0, 30.0], 1);
        assert_series_eq(&out, &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_recursive_calculation() {
        let out = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        let k = 0.5;
        let sma = 20.0;
        let e3 = 40.0 * k + sma * (1.0 - k);
        let e4 = 50.0 * k + e3 * (1.0 - k);
        assert_series_eq(&out, &[f64::NAN, f64::NAN, sma, e3, e4]);
    }

    #[test]
    fn ema_equal_prices() {
        let out = calculate_ema(&[100.0; 5], 3);
        for v in &out[2..] {
            assert!((v - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_empty_and_zero_window() {
        assert!(calculate_ema(&[], 3).is_empty());
        assert!(calculate_ema(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }
}
