//! Core domain types and logic.

pub mod candle;
pub mod interval;
pub mod series;
pub mod signal;
pub mod signal_expr;
pub mod signal_parser;
pub mod indicator;
pub mod registry;
pub mod signal_library;
pub mod fetchers;
pub mod evaluator;
pub mod scaler;
pub mod signal_set;
pub mod model;
pub mod prediction;
pub mod presets;
pub mod strategy;
pub mod backtest;
pub mod universe;
pub mod error;
