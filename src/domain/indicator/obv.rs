//! OBV (On-Balance Volume) indicator implementation.

use crate::domain::indicator::on_valid_many;

/// Calculate OBV (On-Balance Volume) indicator.
///
/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period.
pub fn calculate_obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    on_valid_many(&[close, volume], |s| {
        let (close, volume) = (s[0], s[1]);
        let mut out = Vec::with_capacity(close.len());
        let mut obv = 0.0;
        for i in 0..close.len() {
            if i == 0 {
                obv = volume[0];
            } else if close[i] > close[i - 1] {
                obv += volume[i];
            } else if close[i] < close[i - 1] {
                obv -= volume[i];
            }
            out.push(obv);
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::assert_series_eq;

    #[test]
    fn obv_accumulates_by_direction() {
        let close = [10.0, 11.0, 10.5, 10.5, 12.0];
        let volume = [100.0, 200.0, 150.0, 300.0, 50.0];
        let out = calculate_obv(&close, &volume);
        assert_series_eq(&out, &[100.0, 300.0, 150.0, 150.0, 200.0]);
    }

    #[test]
    fn obv_empty() {
        assert!(calculate_obv(&[], &[]).is_empty());
    }
}
