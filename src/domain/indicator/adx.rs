//! Average Directional Index with the positive and negative directional
//! indicators.
//!
//! +DM = up move when it exceeds the down move and is positive, else 0 (and
//! symmetrically for -DM). TR, +DM and -DM are Wilder-summed over n bars,
//! +DI = 100 × sum(+DM) / sum(TR), DX = 100 × |+DI - -DI| / (+DI + -DI), and ADX
//! is the Wilder average of DX.
//!
//! Warmup: DI values start at index n, ADX at index 2n - 1.

use crate::domain::indicator::atr::true_ranges;
use crate::domain::indicator::{first_valid, safe_div};

pub const DEFAULT_WINDOW: usize = 14;

#[derive(Debug, Clone)]
pub struct AdxOutput {
    pub adx: Vec<f64>,
    pub adx_pos: Vec<f64>,
    pub adx_neg: Vec<f64>,
}

pub fn calculate_adx(high: &[f64], low: &[f64], close: &[f64], window: usize) -> AdxOutput {
    let len = high.len().min(low.len()).min(close.len());
    let start = [high, low, close]
        .iter()
        .map(|s| first_valid(s))
        .max()
        .unwrap_or(0)
        .min(len);
    let raw = adx_raw(&high[start..len], &low[start..len], &close[start..len], window);
    let pad = |values: Vec<f64>| {
        let mut out = vec![f64::NAN; start];
        out.extend(values);
        out
    };
    AdxOutput {
        adx: pad(raw.adx),
        adx_pos: pad(raw.adx_pos),
        adx_neg: pad(raw.adx_neg),
    }
}

fn adx_raw(high: &[f64], low: &[f64], close: &[f64], window: usize) -> AdxOutput {
    let len = high.len();
    let mut out = AdxOutput {
        adx: vec![f64::NAN; len],
        adx_pos: vec![f64::NAN; len],
        adx_neg: vec![f64::NAN; len],
    };
    if window == 0 || len <= window {
        return out;
    }

    let tr = true_ranges(high, low, close);
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    for i in 1..len {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let n = window as f64;
    let mut s_tr: f64 = tr[1..=window].iter().sum();
    let mut s_pos: f64 = plus_dm[1..=window].iter().sum();
    let mut s_neg: f64 = minus_dm[1..=window].iter().sum();

    let mut dx = vec![f64::NAN; len];
    for i in window..len {
        if i > window {
            s_tr = s_tr - s_tr / n + tr[i];
            s_pos = s_pos - s_pos / n + plus_dm[i];
            s_neg = s_neg - s_neg / n + minus_dm[i];
        }
        let di_pos = safe_div(100.0 * s_pos, s_tr);
        let di_neg = safe_div(100.0 * s_neg, s_tr);
        out.adx_pos[i] = di_pos;
        out.adx_neg[i] = di_neg;
        let di_sum = di_pos + di_neg;
        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (di_pos - di_neg).abs() / di_sum
        };
    }

    let first_adx = 2 * window - 1;
    if len > first_adx {
        let mut adx = dx[window..=first_adx].iter().sum::<f64>() / n;
        out.adx[first_adx] = adx;
        for i in (first_adx + 1)..len {
            adx = (adx * (n - 1.0) + dx[i]) / n;
            out.adx[i] = adx;
        }
    }
    out
}
