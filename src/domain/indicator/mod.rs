//! Technical indicator implementations.
//!
//! Every indicator is a pure function over aligned `f64` slices and returns a
//! vector of the same length. Positions without a defined value (warmup) are
//! NaN. Leading NaNs in the input are skipped before computing, so indicators
//! compose: `rsi(ema(close))` warms up for both windows and then produces
//! values as usual.
//!
//! A window of zero yields an all-NaN output.

pub mod adx;
pub mod aroon;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod donchian;
pub mod ema;
pub mod kama;
pub mod kst;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod ulcer;
pub mod wma;

pub use adx::{calculate_adx, AdxOutput};
pub use aroon::{calculate_aroon, AroonOutput};
pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerOutput};
pub use cci::calculate_cci;
pub use donchian::{calculate_donchian, DonchianOutput};
pub use ema::calculate_ema;
pub use kama::calculate_kama;
pub use kst::{calculate_kst, KstOutput, KstParams};
pub use macd::{calculate_macd, calculate_ppo, MacdOutput};
pub use obv::calculate_obv;
pub use roc::{calculate_percent_change, calculate_roc};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;
pub use ulcer::calculate_ulcer_index;
pub use wma::calculate_wma;

/// Index of the first non-NaN value, or `values.len()` if there is none.
pub(crate) fn first_valid(values: &[f64]) -> usize {
    values
        .iter()
        .position(|v| !v.is_nan())
        .unwrap_or(values.len())
}

/// Run `f` over the part of `values` after its leading NaNs and pad the
/// result back to full length.
pub(crate) fn on_valid<F>(values: &[f64], f: F) -> Vec<f64>
where
    F: FnOnce(&[f64]) -> Vec<f64>,
{
    let start = first_valid(values);
    let mut out = vec![f64::NAN; start];
    out.extend(f(&values[start..]));
    out
}

/// Same as [`on_valid`] for indicators over several aligned inputs. The
/// common start is the latest first-valid position among them.
pub(crate) fn on_valid_many<F>(inputs: &[&[f64]], f: F) -> Vec<f64>
where
    F: FnOnce(&[&[f64]]) -> Vec<f64>,
{
    let len = inputs.iter().map(|s| s.len()).min().unwrap_or(0);
    let start = inputs
        .iter()
        .map(|s| first_valid(s))
        .max()
        .unwrap_or(0)
        .min(len);
    let sliced: Vec<&[f64]> = inputs.iter().map(|s| &s[start..len]).collect();
    let mut out = vec![f64::NAN; start];
    out.extend(f(&sliced));
    out
}

/// Apply `f` to every full trailing window of `values`. The first
/// `window - 1` outputs are NaN.
pub(crate) fn rolling<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                f64::NAN
            } else {
                f(&values[i + 1 - window..=i])
            }
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Element-wise `a - b`.
pub(crate) fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// `num / den`, NaN where the denominator is zero.
pub(crate) fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 { f64::NAN } else { num / den }
}
