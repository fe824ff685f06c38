//! Aroon up/down over the last n + 1 values.
//!
//! up = 100 × (n - bars since highest) / n, down likewise for the lowest,
//! indicator = up - down. Warmup: first n values are NaN.

use crate::domain::indicator::{on_valid, rolling};

pub const DEFAULT_WINDOW: usize = 25;

#[derive(Debug, Clone)]
pub struct AroonOutput {
    pub up: Vec<f64>,
    pub down: Vec<f64>,
    pub indicator: Vec<f64>,
}

pub fn calculate_aroon(values: &[f64], window: usize) -> AroonOutput {
    let span = window + 1;
    let n = window as f64;

    let up = on_valid(values, |v| {
        rolling(v, span, |w| {
            // Latest occurrence wins on ties.
            let pos = w
                .iter()
                .enumerate()
                .fold(0, |best, (i, x)| if *x >= w[best] { i } else { best });
            100.0 * pos as f64 / n
        })
    });
    let down = on_valid(values, |v| {
        rolling(v, span, |w| {
            let pos = w
                .iter()
                .enumerate()
                .fold(0, |best, (i, x)| if *x <= w[best] { i } else { best });
            100.0 * pos as f64 / n
        })
    });
    let indicator = up.iter().zip(&down).map(|(u, d)| u - d).collect();

    AroonOutput {
        up,
        down,
        indicator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{assert_series_eq, nan_count};

    #[test]
    fn aroon_warmup() {
        let out = calculate_aroon(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(nan_count(&out.up), 2);
    }

    #[test]
    fn aroon_rising() {
        let out = calculate_aroon(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_series_eq(&out.up, &[f64::NAN, f64::NAN, 100.0, 100.0]);
        assert_series_eq(&out.down, &[f64::NAN, f64::NAN, 0.0, 0.0]);
        assert_series_eq(&out.indicator, &[f64::NAN, f64::NAN, 100.0, 100.0]);
    }

    #[test]
    fn aroon_peak_in_middle() {
        let out = calculate_aroon(&[1.0, 5.0, 2.0], 2);
        assert!((out.up[2] - 50.0).abs() < 1e-12);
        assert!(out.down[2].abs() < 1e-12);
    }
}
