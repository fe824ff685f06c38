//! MACD and Percentage Price Oscillator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Diff = MACD Line - Signal Line
//!
//! PPO is the same construction with the line expressed as a percentage of
//! the slow EMA: PPO = (EMA(fast) - EMA(slow)) / EMA(slow) * 100.
//!
//! Default parameters: fast=12, slow=26, signal=9.

use crate::domain::indicator::{calculate_ema, on_valid, safe_div, subtract};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// Line, signal and difference, each aligned with the input.
#[derive(Debug, Clone)]
pub struct MacdOutput {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub diff: Vec<f64>,
}

impl MacdOutput {
    fn from_line(line: Vec<f64>, signal_window: usize) -> Self {
        let signal = calculate_ema(&line, signal_window);
        let diff = subtract(&line, &signal);
        Self { line, signal, diff }
    }
}

pub fn calculate_macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let ema_fast = calculate_ema(values, fast);
    let ema_slow = calculate_ema(values, slow);
    MacdOutput::from_line(subtract(&ema_fast, &ema_slow), signal)
}

pub fn calculate_ppo(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let line = on_valid(values, |v| {
        let ema_fast = calculate_ema(v, fast);
        let ema_slow = calculate_ema(v, slow);
        ema_fast
            .iter()
            .zip(&ema_slow)
            .map(|(f, s)| safe_div(f - s, *s) * 100.0)
            .collect()
    });
    MacdOutput::from_line(line, signal)
}
