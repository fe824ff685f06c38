//! Rate of change and percent change.
//!
//! ROC(n)[i] = ((x[i] - x[i-n]) / x[i-n]) * 100, 0 when x[i-n] == 0.
//! Warmup: first n values are NaN.
//!
//! Percent change is signed by direction. A positive window looks ahead and
//! is used for labels; a negative window looks back.

use crate::domain::indicator::{on_valid, safe_div};

pub fn calculate_roc(values: &[f64], window: usize) -> Vec<f64> {
    on_valid(values, |v| {
        (0..v.len())
            .map(|i| {
                if window == 0 || i < window {
                    f64::NAN
                } else if v[i - window] == 0.0 {
                    0.0
                } else {
                    (v[i] - v[i - window]) / v[i - window] * 100.0
                }
            })
            .collect()
    })
}

/// `window > 0`: `(x[t+w] - x[t]) / x[t] * 100`, last `w` values NaN.
/// `window < 0`: `(x[t] - x[t-|w|]) / x[t-|w|] * 100`, first `|w|` values NaN.
/// `window == 0` yields all NaN; callers reject it up front.
pub fn calculate_percent_change(values: &[f64], window: i64) -> Vec<f64> {
    let n = values.len();
    let shift = window.unsigned_abs() as usize;
    (0..n)
        .map(|t| {
            if window > 0 && t + shift < n {
                safe_div(values[t + shift] - values[t], values[t]) * 100.0
            } else if window < 0 && t >= shift {
                safe_div(values[t] - values[t - shift], values[t - shift]) * 100.0
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::assert_series_eq;

    #[test]
    fn roc_basic() {
        let out = calculate_roc(&[100.0, 110.0, 121.0], 1);
        assert_series_eq(&out, &[f64::NAN, 10.0, 10.0]);
    }

    #[test]
    fn roc_zero_base_is_zero() {
        let out = calculate_roc(&[0.0, 5.0], 1);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn percent_change_forward() {
        let out = calculate_percent_change(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_series_eq(&out, &[200.0, 100.0, f64::NAN, f64::NAN]);
    }

    #[test]
    fn percent_change_backward() {
        let out = calculate_percent_change(&[1.0, 2.0, 3.0, 4.0], -2);
        assert_series_eq(&out, &[f64::NAN, f64::NAN, 200.0, 100.0]);
    }

    #[test]
    fn percent_change_window_beyond_length() {
        let out = calculate_percent_change(&[1.0, 2.0], 5);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn percent_change_zero_base_is_nan() {
        let out = calculate_percent_change(&[0.0, 2.0], 1);
        assert!(out[0].is_nan());
    }
}
